// SPDX-License-Identifier: Apache-2.0

//! Daily retention sweep: read notifications past retention and expired
//! sessions.

use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use lugline_store::StoreError;
use tokio::task::JoinHandle;

use crate::AppState;

pub fn spawn(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(state.config.cleanup_interval_secs));
        loop {
            interval.tick().await;
            if let Err(err) = sweep(&state).await {
                tracing::error!(error = %err, "cleanup sweep failed");
            }
        }
    })
}

/// One pass. Returns (notifications purged, sessions purged).
pub async fn sweep(state: &AppState) -> Result<(usize, usize), StoreError> {
    state.jobs.cleanup_runs.fetch_add(1, Ordering::Relaxed);
    let now = Utc::now();
    let cutoff = now - chrono::Duration::days(state.config.notification_retention_days);

    let notifications = state
        .store
        .delete_read_notifications_before(cutoff)
        .await?;
    let sessions = state.store.purge_expired_sessions(now).await?;

    state
        .jobs
        .notifications_purged
        .fetch_add(notifications as u64, Ordering::Relaxed);
    state
        .jobs
        .sessions_purged
        .fetch_add(sessions as u64, Ordering::Relaxed);
    tracing::info!(notifications, sessions, "cleanup sweep complete");
    Ok((notifications, sessions))
}
