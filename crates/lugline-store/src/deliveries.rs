// SPDX-License-Identifier: Apache-2.0

use crate::error::{Result, StoreError};
use crate::{opt_from_millis, opt_millis, to_millis, Store};
use lugline_model::{Delivery, DeliveryStatus, PaymentStatus, Priority};
use rusqlite::{params, Connection, Row};

const DELIVERY_COLUMNS: &str = "id, customer_id, driver_id, pickup_location, drop_location, items,
    status, priority, scheduled_pickup, estimated_delivery, actual_pickup_time,
    actual_delivery_time, delivery_fee, distance, estimated_duration, tracking, rating,
    payment_status, auto_assigned_at, is_urgent, created_at, updated_at";

struct RawDelivery {
    id: String,
    customer_id: String,
    driver_id: Option<String>,
    pickup_location: String,
    drop_location: String,
    items: String,
    status: String,
    priority: String,
    scheduled_pickup: i64,
    estimated_delivery: Option<i64>,
    actual_pickup_time: Option<i64>,
    actual_delivery_time: Option<i64>,
    delivery_fee: f64,
    distance: f64,
    estimated_duration: Option<i64>,
    tracking: String,
    rating: String,
    payment_status: String,
    auto_assigned_at: Option<i64>,
    is_urgent: bool,
    created_at: i64,
    updated_at: i64,
}

fn read_delivery(row: &Row<'_>) -> rusqlite::Result<RawDelivery> {
    Ok(RawDelivery {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        driver_id: row.get(2)?,
        pickup_location: row.get(3)?,
        drop_location: row.get(4)?,
        items: row.get(5)?,
        status: row.get(6)?,
        priority: row.get(7)?,
        scheduled_pickup: row.get(8)?,
        estimated_delivery: row.get(9)?,
        actual_pickup_time: row.get(10)?,
        actual_delivery_time: row.get(11)?,
        delivery_fee: row.get(12)?,
        distance: row.get(13)?,
        estimated_duration: row.get(14)?,
        tracking: row.get(15)?,
        rating: row.get(16)?,
        payment_status: row.get(17)?,
        auto_assigned_at: row.get(18)?,
        is_urgent: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
    })
}

impl RawDelivery {
    fn into_delivery(self) -> Result<Delivery> {
        let status =
            DeliveryStatus::parse(&self.status).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let priority =
            Priority::parse(&self.priority).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let payment_status = PaymentStatus::parse(&self.payment_status)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Delivery {
            id: self.id,
            customer_id: self.customer_id,
            driver_id: self.driver_id,
            pickup_location: serde_json::from_str(&self.pickup_location)?,
            drop_location: serde_json::from_str(&self.drop_location)?,
            items: serde_json::from_str(&self.items)?,
            status,
            priority,
            scheduled_pickup: crate::from_millis(self.scheduled_pickup)?,
            estimated_delivery: opt_from_millis(self.estimated_delivery)?,
            actual_pickup_time: opt_from_millis(self.actual_pickup_time)?,
            actual_delivery_time: opt_from_millis(self.actual_delivery_time)?,
            delivery_fee: self.delivery_fee,
            distance: self.distance,
            estimated_duration: self.estimated_duration.map(|d| d as u32),
            tracking: serde_json::from_str(&self.tracking)?,
            rating: serde_json::from_str(&self.rating)?,
            payment_status,
            auto_assigned_at: opt_from_millis(self.auto_assigned_at)?,
            is_urgent: self.is_urgent,
            created_at: crate::from_millis(self.created_at)?,
            updated_at: crate::from_millis(self.updated_at)?,
        })
    }
}

fn collect_deliveries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Delivery>> {
    let mut stmt = conn.prepare(sql)?;
    let raws = stmt
        .query_map(params, read_delivery)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawDelivery::into_delivery).collect()
}

impl Store {
    pub async fn insert_delivery(&self, delivery: Delivery) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO deliveries (id, customer_id, driver_id, pickup_location,
                 drop_location, items, status, priority, priority_rank, scheduled_pickup,
                 estimated_delivery, actual_pickup_time, actual_delivery_time, delivery_fee,
                 distance, estimated_duration, tracking, rating, payment_status,
                 auto_assigned_at, is_urgent, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                 ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
                params![
                    delivery.id,
                    delivery.customer_id,
                    delivery.driver_id,
                    serde_json::to_string(&delivery.pickup_location)?,
                    serde_json::to_string(&delivery.drop_location)?,
                    serde_json::to_string(&delivery.items)?,
                    delivery.status.as_str(),
                    delivery.priority.as_str(),
                    delivery.priority.rank(),
                    to_millis(delivery.scheduled_pickup),
                    opt_millis(delivery.estimated_delivery),
                    opt_millis(delivery.actual_pickup_time),
                    opt_millis(delivery.actual_delivery_time),
                    delivery.delivery_fee,
                    delivery.distance,
                    delivery.estimated_duration.map(i64::from),
                    serde_json::to_string(&delivery.tracking)?,
                    serde_json::to_string(&delivery.rating)?,
                    delivery.payment_status.as_str(),
                    opt_millis(delivery.auto_assigned_at),
                    delivery.is_urgent,
                    to_millis(delivery.created_at),
                    to_millis(delivery.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Full-document rewrite, last write wins.
    pub async fn update_delivery(&self, delivery: Delivery) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE deliveries SET customer_id = ?2, driver_id = ?3, pickup_location = ?4,
                 drop_location = ?5, items = ?6, status = ?7, priority = ?8, priority_rank = ?9,
                 scheduled_pickup = ?10, estimated_delivery = ?11, actual_pickup_time = ?12,
                 actual_delivery_time = ?13, delivery_fee = ?14, distance = ?15,
                 estimated_duration = ?16, tracking = ?17, rating = ?18, payment_status = ?19,
                 auto_assigned_at = ?20, is_urgent = ?21, updated_at = ?22
                 WHERE id = ?1",
                params![
                    delivery.id,
                    delivery.customer_id,
                    delivery.driver_id,
                    serde_json::to_string(&delivery.pickup_location)?,
                    serde_json::to_string(&delivery.drop_location)?,
                    serde_json::to_string(&delivery.items)?,
                    delivery.status.as_str(),
                    delivery.priority.as_str(),
                    delivery.priority.rank(),
                    to_millis(delivery.scheduled_pickup),
                    opt_millis(delivery.estimated_delivery),
                    opt_millis(delivery.actual_pickup_time),
                    opt_millis(delivery.actual_delivery_time),
                    delivery.delivery_fee,
                    delivery.distance,
                    delivery.estimated_duration.map(i64::from),
                    serde_json::to_string(&delivery.tracking)?,
                    serde_json::to_string(&delivery.rating)?,
                    delivery.payment_status.as_str(),
                    opt_millis(delivery.auto_assigned_at),
                    delivery.is_urgent,
                    to_millis(delivery.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn find_delivery(&self, id: &str) -> Result<Option<Delivery>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], read_delivery)?;
            match rows.next() {
                Some(raw) => Ok(Some(raw?.into_delivery()?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// One page of a party's deliveries, newest first. `driver` switches the
    /// ownership column.
    pub async fn list_for_party(
        &self,
        user_id: &str,
        driver: bool,
        status: Option<DeliveryStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Delivery>, usize)> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let owner_col = if driver { "driver_id" } else { "customer_id" };
            let mut where_sql = format!("{owner_col} = ?");
            let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> =
                vec![Box::new(user_id.clone())];
            if let Some(status) = status {
                where_sql.push_str(" AND status = ?");
                params_vec.push(Box::new(status.as_str().to_string()));
            }

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM deliveries WHERE {where_sql}"),
                rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                |row| row.get(0),
            )?;

            params_vec.push(Box::new(limit as i64));
            params_vec.push(Box::new(offset as i64));
            let deliveries = {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE {where_sql}
                     ORDER BY created_at DESC LIMIT ? OFFSET ?"
                ))?;
                let raws = stmt
                    .query_map(
                        rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                        read_delivery,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                raws.into_iter()
                    .map(RawDelivery::into_delivery)
                    .collect::<Result<Vec<_>>>()?
            };
            Ok((deliveries, total as usize))
        })
        .await
    }

    /// Admin listing with status/priority/address-substring filters.
    pub async fn list_all(
        &self,
        status: Option<DeliveryStatus>,
        priority: Option<Priority>,
        search: Option<String>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Delivery>, usize)> {
        self.with_conn(move |conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
            if let Some(status) = status {
                clauses.push("status = ?");
                params_vec.push(Box::new(status.as_str().to_string()));
            }
            if let Some(priority) = priority {
                clauses.push("priority = ?");
                params_vec.push(Box::new(priority.as_str().to_string()));
            }
            if let Some(search) = &search {
                clauses.push(
                    "(json_extract(pickup_location, '$.address') LIKE ?
                      OR json_extract(drop_location, '$.address') LIKE ?)",
                );
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
                &format!("SELECT COUNT(*) FROM deliveries{where_sql}"),
                rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                |row| row.get(0),
            )?;

            params_vec.push(Box::new(limit as i64));
            params_vec.push(Box::new(offset as i64));
            let deliveries = {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {DELIVERY_COLUMNS} FROM deliveries{where_sql}
                     ORDER BY created_at DESC LIMIT ? OFFSET ?"
                ))?;
                let raws = stmt
                    .query_map(
                        rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                        read_delivery,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                raws.into_iter()
                    .map(RawDelivery::into_delivery)
                    .collect::<Result<Vec<_>>>()?
            };
            Ok((deliveries, total as usize))
        })
        .await
    }

    /// The driver-facing board: open requests, urgent first, oldest first
    /// within a priority.
    pub async fn list_available(&self, limit: usize) -> Result<Vec<Delivery>> {
        self.with_conn(move |conn| {
            collect_deliveries(
                conn,
                &format!(
                    "SELECT {DELIVERY_COLUMNS} FROM deliveries
                     WHERE status = 'pending' AND driver_id IS NULL
                     ORDER BY priority_rank DESC, created_at ASC LIMIT ?1"
                ),
                params![limit as i64],
            )
        })
        .await
    }

    /// Sweep input: unassigned pending deliveries created before `cutoff`.
    pub async fn list_stale_pending(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Delivery>> {
        self.with_conn(move |conn| {
            collect_deliveries(
                conn,
                &format!(
                    "SELECT {DELIVERY_COLUMNS} FROM deliveries
                     WHERE status = 'pending' AND driver_id IS NULL AND created_at < ?1
                     ORDER BY created_at ASC"
                ),
                params![to_millis(cutoff)],
            )
        })
        .await
    }

    pub async fn recent_deliveries(&self, limit: usize) -> Result<Vec<Delivery>> {
        self.with_conn(move |conn| {
            collect_deliveries(
                conn,
                &format!(
                    "SELECT {DELIVERY_COLUMNS} FROM deliveries ORDER BY created_at DESC LIMIT ?1"
                ),
                params![limit as i64],
            )
        })
        .await
    }

    pub async fn count_deliveries(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM deliveries", [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }

    pub async fn count_by_status(&self, status: DeliveryStatus) -> Result<usize> {
        self.with_conn(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM deliveries WHERE status = ?1",
                params![status.as_str()],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
    }

    /// Pending deliveries older than `cutoff` regardless of assignment; the
    /// dashboard's "overdue" number.
    pub async fn count_overdue_pending(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<usize> {
        self.with_conn(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM deliveries WHERE status = 'pending' AND created_at < ?1",
                params![to_millis(cutoff)],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
    }

    pub async fn count_for_driver_in(
        &self,
        driver_id: &str,
        statuses: &[DeliveryStatus],
    ) -> Result<usize> {
        let driver_id = driver_id.to_string();
        let list = statuses
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        self.with_conn(move |conn| {
            let n: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM deliveries WHERE driver_id = ?1 AND status IN ({list})"
                ),
                params![driver_id],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
        .await
    }

    /// Ids of this driver's in-flight deliveries, for location fan-out.
    pub async fn active_delivery_ids_for_driver(&self, driver_id: &str) -> Result<Vec<String>> {
        let driver_id = driver_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM deliveries
                 WHERE driver_id = ?1 AND status IN ('assigned', 'picked_up', 'in_transit')",
            )?;
            let ids = stmt
                .query_map(params![driver_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::temp_store;
    use crate::Store;
    use chrono::{Duration, Utc};
    use lugline_model::{
        Delivery, DeliveryItem, DeliveryStatus, Location, Priority, Role, User,
    };
    use pretty_assertions::assert_eq;

    fn location(address: &str) -> Location {
        Location {
            address: address.to_string(),
            latitude: 52.5,
            longitude: 13.4,
            contact_name: None,
            contact_phone: None,
            instructions: None,
        }
    }

    fn delivery(customer_id: &str, priority: Priority) -> Delivery {
        Delivery::create(
            customer_id,
            location("1 Airport Way"),
            location("9 Hotel Plaza"),
            vec![DeliveryItem {
                description: "suitcase".into(),
                weight: 10.0,
                dimensions: None,
                value: None,
                fragile: false,
            }],
            priority,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    async fn seed_customer(store: &Store) -> User {
        let user = User::new("Cleo", "cleo@example.com", Role::Customer, Utc::now());
        store.insert_user(user.clone(), "h".into()).await.unwrap();
        user
    }

    #[tokio::test]
    async fn insert_find_update_round_trip() {
        let (store, _dir) = temp_store();
        let customer = seed_customer(&store).await;
        let mut d = delivery(&customer.id, Priority::Medium);
        store.insert_delivery(d.clone()).await.unwrap();

        let found = store.find_delivery(&d.id).await.unwrap().unwrap();
        assert_eq!(found.id, d.id);
        assert_eq!(found.status, DeliveryStatus::Pending);
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.tracking.len(), 1);
        assert_eq!(found.delivery_fee, d.delivery_fee);

        d.assign_to("drv-1", "Assigned by admin", false, Utc::now())
            .unwrap();
        store.update_delivery(d.clone()).await.unwrap();
        let found = store.find_delivery(&d.id).await.unwrap().unwrap();
        assert_eq!(found.status, DeliveryStatus::Assigned);
        assert_eq!(found.driver_id.as_deref(), Some("drv-1"));
        assert_eq!(found.tracking.len(), 2);
    }

    #[tokio::test]
    async fn available_board_orders_urgent_first() {
        let (store, _dir) = temp_store();
        let customer = seed_customer(&store).await;
        let low = delivery(&customer.id, Priority::Low);
        let urgent = delivery(&customer.id, Priority::Urgent);
        let medium = delivery(&customer.id, Priority::Medium);
        for d in [&low, &urgent, &medium] {
            store.insert_delivery(d.clone()).await.unwrap();
        }

        let board = store.list_available(20).await.unwrap();
        assert_eq!(board.len(), 3);
        assert_eq!(board[0].id, urgent.id);
        assert_eq!(board[2].id, low.id);
    }

    #[tokio::test]
    async fn assigned_deliveries_leave_the_board() {
        let (store, _dir) = temp_store();
        let customer = seed_customer(&store).await;
        let mut d = delivery(&customer.id, Priority::Medium);
        store.insert_delivery(d.clone()).await.unwrap();
        d.assign_to("drv-1", "x", false, Utc::now()).unwrap();
        store.update_delivery(d).await.unwrap();
        assert!(store.list_available(20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_pending_respects_cutoff() {
        let (store, _dir) = temp_store();
        let customer = seed_customer(&store).await;
        let mut old = delivery(&customer.id, Priority::Medium);
        old.created_at = Utc::now() - Duration::hours(30);
        let fresh = delivery(&customer.id, Priority::Medium);
        store.insert_delivery(old.clone()).await.unwrap();
        store.insert_delivery(fresh.clone()).await.unwrap();

        let cutoff = Utc::now() - Duration::hours(24);
        let stale = store.list_stale_pending(cutoff).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, old.id);
        assert_eq!(store.count_overdue_pending(cutoff).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn party_listing_pages_and_filters() {
        let (store, _dir) = temp_store();
        let customer = seed_customer(&store).await;
        for _ in 0..3 {
            store
                .insert_delivery(delivery(&customer.id, Priority::Medium))
                .await
                .unwrap();
        }
        let mut done = delivery(&customer.id, Priority::Medium);
        done.assign_to("drv-1", "x", false, Utc::now()).unwrap();
        store.insert_delivery(done.clone()).await.unwrap();

        let (all, total) = store
            .list_for_party(&customer.id, false, None, 2, 0)
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(all.len(), 2);

        let (assigned, total) = store
            .list_for_party(&customer.id, false, Some(DeliveryStatus::Assigned), 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(assigned[0].id, done.id);

        let (driver_side, total) = store
            .list_for_party("drv-1", true, None, 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(driver_side[0].id, done.id);
    }

    #[tokio::test]
    async fn admin_listing_searches_addresses() {
        let (store, _dir) = temp_store();
        let customer = seed_customer(&store).await;
        let mut special = delivery(&customer.id, Priority::High);
        special.pickup_location.address = "42 Central Station".into();
        store.insert_delivery(special.clone()).await.unwrap();
        store
            .insert_delivery(delivery(&customer.id, Priority::Medium))
            .await
            .unwrap();

        let (found, total) = store
            .list_all(None, None, Some("central".into()), 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, special.id);

        let (high, _) = store
            .list_all(None, Some(Priority::High), None, 10, 0)
            .await
            .unwrap();
        assert_eq!(high.len(), 1);
    }

    #[tokio::test]
    async fn driver_counters() {
        let (store, _dir) = temp_store();
        let customer = seed_customer(&store).await;
        let mut active = delivery(&customer.id, Priority::Medium);
        active.assign_to("drv-1", "x", false, Utc::now()).unwrap();
        store.insert_delivery(active.clone()).await.unwrap();

        let mut done = delivery(&customer.id, Priority::Medium);
        done.assign_to("drv-1", "x", false, Utc::now()).unwrap();
        done.transition_to(DeliveryStatus::PickedUp, None, Utc::now())
            .unwrap();
        done.transition_to(DeliveryStatus::InTransit, None, Utc::now())
            .unwrap();
        done.transition_to(DeliveryStatus::Delivered, None, Utc::now())
            .unwrap();
        store.insert_delivery(done).await.unwrap();

        let active_count = store
            .count_for_driver_in(
                "drv-1",
                &[
                    DeliveryStatus::Assigned,
                    DeliveryStatus::PickedUp,
                    DeliveryStatus::InTransit,
                ],
            )
            .await
            .unwrap();
        assert_eq!(active_count, 1);
        let delivered = store
            .count_for_driver_in("drv-1", &[DeliveryStatus::Delivered])
            .await
            .unwrap();
        assert_eq!(delivered, 1);

        let ids = store.active_delivery_ids_for_driver("drv-1").await.unwrap();
        assert_eq!(ids, vec![active.id]);
    }
}
