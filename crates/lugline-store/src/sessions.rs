// SPDX-License-Identifier: Apache-2.0

use crate::error::Result;
use crate::users::load_user;
use crate::{to_millis, Store};
use chrono::{DateTime, Utc};
use lugline_model::User;
use rusqlite::params;

impl Store {
    pub async fn insert_session(
        &self,
        token: &str,
        user_id: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let token = token.to_string();
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token, user_id, to_millis(created_at), to_millis(expires_at)],
            )?;
            Ok(())
        })
        .await
    }

    /// Resolves a bearer token to its account. Expired tokens resolve to
    /// nothing; they are swept later by the cleanup job.
    pub async fn find_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
            )?;
            let mut rows = stmt.query_map(params![token, to_millis(now)], |row| {
                row.get::<_, String>(0)
            })?;
            match rows.next() {
                Some(user_id) => load_user(conn, &user_id?),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            let n = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Ok(n > 0)
        })
        .await
    }

    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(move |conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![to_millis(now)],
            )?;
            Ok(n)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::temp_store;
    use chrono::{Duration, Utc};
    use lugline_model::{Role, User};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn token_resolves_until_expiry() {
        let (store, _dir) = temp_store();
        let user = User::new("Sam", "sam@example.com", Role::Customer, Utc::now());
        store.insert_user(user.clone(), "h".into()).await.unwrap();

        let now = Utc::now();
        store
            .insert_session("tok-1", &user.id, now, now + Duration::days(7))
            .await
            .unwrap();

        let resolved = store.find_session_user("tok-1", now).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id.clone()));

        let later = now + Duration::days(8);
        assert!(store.find_session_user("tok-1", later).await.unwrap().is_none());
        assert!(store
            .find_session_user("unknown", now)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn logout_deletes_the_token() {
        let (store, _dir) = temp_store();
        let user = User::new("Sam", "sam@example.com", Role::Customer, Utc::now());
        store.insert_user(user.clone(), "h".into()).await.unwrap();

        let now = Utc::now();
        store
            .insert_session("tok-1", &user.id, now, now + Duration::days(7))
            .await
            .unwrap();
        assert!(store.delete_session("tok-1").await.unwrap());
        assert!(!store.delete_session("tok-1").await.unwrap());
        assert!(store.find_session_user("tok-1", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_drops_only_expired_rows() {
        let (store, _dir) = temp_store();
        let user = User::new("Sam", "sam@example.com", Role::Customer, Utc::now());
        store.insert_user(user.clone(), "h".into()).await.unwrap();

        let now = Utc::now();
        store
            .insert_session("old", &user.id, now - Duration::days(9), now - Duration::days(2))
            .await
            .unwrap();
        store
            .insert_session("live", &user.id, now, now + Duration::days(7))
            .await
            .unwrap();

        assert_eq!(store.purge_expired_sessions(now).await.unwrap(), 1);
        assert!(store.find_session_user("live", now).await.unwrap().is_some());
    }
}
