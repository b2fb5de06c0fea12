// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Meshwork Network

use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use meshwork_auth_server::api::router;
use meshwork_auth_server::config::{ServerConfig, LOG_FORMAT_ENV};
use meshwork_auth_server::state::AppState;
use meshwork_auth_server::storage::AuthDatabase;

/// How often expired, unused challenges are pruned.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ServerConfig::from_env();
    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e.message, "failed to initialize application state");
            std::process::exit(1);
        }
    };

    tokio::spawn(prune_loop(state.db.clone()));

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!("Meshwork auth server listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let format = std::env::var(LOG_FORMAT_ENV).unwrap_or_default();
    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Periodically delete unused challenges whose expiry has passed.
async fn prune_loop(db: std::sync::Arc<AuthDatabase>) {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);
    loop {
        interval.tick().await;
        let db = db.clone();
        let cutoff = chrono::Utc::now();
        let result =
            tokio::task::spawn_blocking(move || db.prune_challenges_expired_before(cutoff)).await;
        match result {
            Ok(Ok(removed)) if removed > 0 => {
                tracing::info!(removed, "pruned expired challenges");
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "challenge pruning failed"),
            Err(e) => tracing::warn!(error = %e, "challenge pruning task panicked"),
        }
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received");
}
