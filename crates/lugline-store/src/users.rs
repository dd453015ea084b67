// SPDX-License-Identifier: Apache-2.0

use crate::error::{Result, StoreError};
use crate::{from_millis, to_millis, Store};
use chrono::{DateTime, Utc};
use lugline_model::{DriverLocation, Role, User};
use rusqlite::{params, Connection, Row};

const USER_COLUMNS: &str =
    "id, name, email, role, phone, address, avatar, is_active, driver_profile, created_at, updated_at";

struct RawUser {
    id: String,
    name: String,
    email: String,
    role: String,
    phone: Option<String>,
    address: String,
    avatar: String,
    is_active: bool,
    driver_profile: Option<String>,
    created_at: i64,
    updated_at: i64,
}

fn read_user(row: &Row<'_>) -> rusqlite::Result<RawUser> {
    Ok(RawUser {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        phone: row.get(4)?,
        address: row.get(5)?,
        avatar: row.get(6)?,
        is_active: row.get(7)?,
        driver_profile: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl RawUser {
    fn into_user(self) -> Result<User> {
        let role = Role::parse(&self.role).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let driver_profile = match self.driver_profile {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            phone: self.phone,
            address: self.address,
            avatar: self.avatar,
            is_active: self.is_active,
            driver_profile,
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

fn profile_columns(user: &User) -> Result<(Option<String>, Option<i64>)> {
    match &user.driver_profile {
        Some(profile) => Ok((
            Some(serde_json::to_string(profile)?),
            Some(i64::from(profile.is_available)),
        )),
        None => Ok((None, None)),
    }
}

pub(crate) fn load_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], read_user)?;
    match rows.next() {
        Some(raw) => Ok(Some(raw?.into_user()?)),
        None => Ok(None),
    }
}

fn write_user(conn: &Connection, user: &User) -> Result<()> {
    let (profile_json, available) = profile_columns(user)?;
    conn.execute(
        "UPDATE users SET name = ?2, email = ?3, phone = ?4, address = ?5, avatar = ?6,
         is_active = ?7, driver_profile = ?8, driver_available = ?9, updated_at = ?10
         WHERE id = ?1",
        params![
            user.id,
            user.name,
            user.email,
            user.phone,
            user.address,
            user.avatar,
            user.is_active,
            profile_json,
            available,
            to_millis(user.updated_at),
        ],
    )?;
    Ok(())
}

impl Store {
    pub async fn insert_user(&self, user: User, password_hash: String) -> Result<()> {
        self.with_conn(move |conn| {
            let (profile_json, available) = profile_columns(&user)?;
            conn.execute(
                "INSERT INTO users (id, name, email, password_hash, role, phone, address, avatar,
                 is_active, driver_profile, driver_available, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    user.id,
                    user.name,
                    user.email,
                    password_hash,
                    user.role.as_str(),
                    user.phone,
                    user.address,
                    user.avatar,
                    user.is_active,
                    profile_json,
                    available,
                    to_millis(user.created_at),
                    to_millis(user.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_string();
        self.with_conn(move |conn| load_user(conn, &id)).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_ascii_lowercase();
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?;
            let mut rows = stmt.query_map(params![email], read_user)?;
            match rows.next() {
                Some(raw) => Ok(Some(raw?.into_user()?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Login lookup: the account plus its password hash.
    pub async fn find_login_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        let email = email.trim().to_ascii_lowercase();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
            ))?;
            let mut rows = stmt.query_map(params![email], |row| {
                let raw = read_user(row)?;
                let hash: String = row.get(11)?;
                Ok((raw, hash))
            })?;
            match rows.next() {
                Some(pair) => {
                    let (raw, hash) = pair?;
                    Ok(Some((raw.into_user()?, hash)))
                }
                None => Ok(None),
            }
        })
        .await
    }

    /// Full-document account update (last write wins).
    pub async fn update_user(&self, user: User) -> Result<()> {
        self.with_conn(move |conn| write_user(conn, &user)).await
    }

    pub async fn list_users(
        &self,
        role: Option<Role>,
        search: Option<String>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<User>, usize)> {
        self.with_conn(move |conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
            if let Some(role) = role {
                clauses.push("role = ?");
                params_vec.push(Box::new(role.as_str().to_string()));
            }
            if let Some(search) = &search {
                clauses.push("(name LIKE ? OR email LIKE ?)");
                let pattern = format!("%{search}%");
                params_vec.push(Box::new(pattern.clone()));
                params_vec.push(Box::new(pattern));
            }
            let where_sql = if clauses.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", clauses.join(" AND "))
            };

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM users{where_sql}"),
                rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                |row| row.get(0),
            )?;

            params_vec.push(Box::new(limit as i64));
            params_vec.push(Box::new(offset as i64));
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users{where_sql} ORDER BY created_at DESC LIMIT ? OFFSET ?"
            ))?;
            let raws = stmt
                .query_map(
                    rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                    read_user,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let users = raws
                .into_iter()
                .map(RawUser::into_user)
                .collect::<Result<Vec<_>>>()?;
            Ok((users, total as usize))
        })
        .await
    }

    pub async fn count_users(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }

    pub async fn count_drivers(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'driver'",
                [],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
    }

    pub async fn count_available_drivers(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'driver' AND is_active = 1 AND driver_available = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
    }

    pub async fn list_admins(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE role = 'admin'"))?;
            let raws = stmt
                .query_map([], read_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            raws.into_iter().map(RawUser::into_user).collect()
        })
        .await
    }

    /// The matching rule: first available active driver of an unordered scan.
    pub async fn first_available_driver(&self) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE role = 'driver' AND is_active = 1 AND driver_available = 1 LIMIT 1"
            ))?;
            let mut rows = stmt.query_map([], read_user)?;
            match rows.next() {
                Some(raw) => Ok(Some(raw?.into_user()?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Flips a driver's availability flag; returns the updated account, or
    /// `None` when the id is unknown or not a driver.
    pub async fn set_driver_availability(
        &self,
        user_id: &str,
        available: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let Some(mut user) = load_user(conn, &user_id)? else {
                return Ok(None);
            };
            let Some(profile) = user.driver_profile.as_mut() else {
                return Ok(None);
            };
            profile.is_available = available;
            user.updated_at = now;
            write_user(conn, &user)?;
            Ok(Some(user))
        })
        .await
    }

    pub async fn set_driver_location(
        &self,
        user_id: &str,
        location: DriverLocation,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let Some(mut user) = load_user(conn, &user_id)? else {
                return Ok(None);
            };
            let Some(profile) = user.driver_profile.as_mut() else {
                return Ok(None);
            };
            profile.current_location = Some(location);
            user.updated_at = now;
            write_user(conn, &user)?;
            Ok(Some(user))
        })
        .await
    }

    /// Completion bookkeeping: the driver frees up and their tally grows.
    pub async fn record_driver_delivered(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let Some(mut user) = load_user(conn, &user_id)? else {
                return Ok(None);
            };
            let Some(profile) = user.driver_profile.as_mut() else {
                return Ok(None);
            };
            profile.is_available = true;
            profile.total_deliveries += 1;
            user.updated_at = now;
            write_user(conn, &user)?;
            Ok(Some(user))
        })
        .await
    }

    pub async fn set_user_active(
        &self,
        user_id: &str,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let Some(mut user) = load_user(conn, &user_id)? else {
                return Ok(None);
            };
            user.is_active = active;
            user.updated_at = now;
            write_user(conn, &user)?;
            Ok(Some(user))
        })
        .await
    }
}
