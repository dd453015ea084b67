// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use lugline_server::assistant::{AssistantBackend, DisabledAssistant, GeminiAssistant};
use lugline_server::config::AppConfig;
use lugline_server::mail::{HttpMailer, Mailer, NoopMailer};
use lugline_server::{build_router, jobs, seed_admin, AppState, CRATE_NAME};
use lugline_store::Store;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = AppConfig::from_env();
    config.validate()?;
    init_tracing(config.log_json);

    let store = Store::open(&config.db_path)
        .map_err(|e| format!("open database {}: {e}", config.db_path.display()))?;

    if let (Some(email), Some(password)) = (&config.seed_admin_email, &config.seed_admin_password) {
        let created = seed_admin(&store, email, password)
            .await
            .map_err(|e| format!("seed admin account: {e}"))?;
        if created {
            info!(email = %email, "seeded admin account");
        }
    }

    let mailer: Arc<dyn Mailer> = if config.mail_enabled() {
        let base = config.mail_api_base.as_deref().unwrap_or_default();
        let api_key = config.mail_api_key.as_deref().unwrap_or_default();
        let mailer = HttpMailer::new(base, api_key, &config.mail_from)
            .map_err(|e| format!("build mail client: {e}"))?;
        Arc::new(mailer)
    } else {
        info!("outbound mail disabled; emails will be dropped");
        Arc::new(NoopMailer)
    };

    let assistant: Arc<dyn AssistantBackend> = if let Some(api_key) = &config.ai_api_key {
        let backend = GeminiAssistant::new(&config.ai_api_base, &config.ai_model, api_key)
            .map_err(|e| format!("build assistant client: {e}"))?;
        Arc::new(backend)
    } else {
        info!("assistant disabled; Lassy will answer with a canned reply");
        Arc::new(DisabledAssistant)
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, store, mailer, assistant);
    let job_handles = jobs::spawn_all(&state);
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr}: {e}"))?;
    info!("{CRATE_NAME} listening on {bind_addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown_signal())
    .await
    .map_err(|e| format!("server failed: {e}"))?;

    for handle in job_handles {
        handle.abort();
    }
    Ok(())
}
