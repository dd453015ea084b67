// SPDX-License-Identifier: Apache-2.0

//! In-process counters rendered by the `/metrics` endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-route request counters and latency samples.
#[derive(Default)]
pub struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
}

impl RequestMetrics {
    pub async fn observe_request(&self, route: &str, status: u16, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts.entry((route.to_string(), status)).or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_insert_with(Vec::new)
            .push(latency.as_nanos() as u64);
    }

    pub async fn status_count(&self, route: &str, status: u16) -> u64 {
        let counts = self.counts.lock().await;
        counts
            .get(&(route.to_string(), status))
            .copied()
            .unwrap_or(0)
    }
}

/// Counters maintained by the background jobs and the mailer.
#[derive(Default)]
pub struct JobMetrics {
    pub auto_assign_runs: AtomicU64,
    pub deliveries_auto_assigned: AtomicU64,
    pub deliveries_escalated: AtomicU64,
    pub cleanup_runs: AtomicU64,
    pub notifications_purged: AtomicU64,
    pub sessions_purged: AtomicU64,
    pub mail_sent: AtomicU64,
    pub mail_failed: AtomicU64,
}

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx]
}

fn counter_line(body: &mut String, name: &str, value: u64) {
    body.push_str(&format!(
        "lugline_{name}{{version=\"{METRIC_VERSION}\"}} {value}\n"
    ));
}

/// Renders the Prometheus-style text body for `/metrics`.
pub async fn render_metrics(
    requests: &RequestMetrics,
    jobs: &JobMetrics,
    ws_connections: u64,
    uptime: Duration,
) -> String {
    let mut body = String::new();
    counter_line(&mut body, "uptime_seconds", uptime.as_secs());
    counter_line(&mut body, "ws_connections", ws_connections);
    counter_line(
        &mut body,
        "auto_assign_runs_total",
        jobs.auto_assign_runs.load(Ordering::Relaxed),
    );
    counter_line(
        &mut body,
        "deliveries_auto_assigned_total",
        jobs.deliveries_auto_assigned.load(Ordering::Relaxed),
    );
    counter_line(
        &mut body,
        "deliveries_escalated_total",
        jobs.deliveries_escalated.load(Ordering::Relaxed),
    );
    counter_line(
        &mut body,
        "cleanup_runs_total",
        jobs.cleanup_runs.load(Ordering::Relaxed),
    );
    counter_line(
        &mut body,
        "notifications_purged_total",
        jobs.notifications_purged.load(Ordering::Relaxed),
    );
    counter_line(
        &mut body,
        "sessions_purged_total",
        jobs.sessions_purged.load(Ordering::Relaxed),
    );
    counter_line(
        &mut body,
        "mail_sent_total",
        jobs.mail_sent.load(Ordering::Relaxed),
    );
    counter_line(
        &mut body,
        "mail_failed_total",
        jobs.mail_failed.load(Ordering::Relaxed),
    );

    let req_counts = requests.counts.lock().await.clone();
    for ((route, status), count) in req_counts {
        body.push_str(&format!(
            "lugline_http_requests_total{{version=\"{METRIC_VERSION}\",route=\"{route}\",status=\"{status}\"}} {count}\n"
        ));
    }
    let req_lat = requests.latency_ns.lock().await.clone();
    for (route, vals) in req_lat {
        body.push_str(&format!(
            "lugline_http_request_latency_p50_seconds{{version=\"{METRIC_VERSION}\",route=\"{route}\"}} {:.6}\n",
            percentile_ns(&vals, 0.5) as f64 / 1_000_000_000.0
        ));
        body.push_str(&format!(
            "lugline_http_request_latency_p95_seconds{{version=\"{METRIC_VERSION}\",route=\"{route}\"}} {:.6}\n",
            percentile_ns(&vals, 0.95) as f64 / 1_000_000_000.0
        ));
    }
    body
}
