// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{process::ExitCode, sync::Arc};

use paylink_server::{
    api::router,
    auth::Eip191Verifier,
    blockchain::ChainVerifier,
    config::AppConfig,
    providers::{BlockradarClient, StripeClient},
    state::AppState,
    storage::{Store, DATABASE_FILE},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

async fn run() -> Result<(), String> {
    let config = AppConfig::from_env().map_err(|e| format!("configuration: {e}"))?;

    let db_path = config.data_dir.join(DATABASE_FILE);
    let store = Store::open(&db_path).map_err(|e| format!("opening {}: {e}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "Database opened");

    let stripe = StripeClient::new(&config.stripe);
    let blockradar = BlockradarClient::new(&config.blockradar).map_err(|e| e.to_string())?;
    let verifier = ChainVerifier::new(
        config.chain.network.clone(),
        &config.chain.rpc_url,
        config.chain.min_confirmations,
    )
    .map_err(|e| e.to_string())?;
    tracing::info!(
        network = config.chain.network.name,
        chain_id = config.chain.network.chain_id,
        min_confirmations = config.chain.min_confirmations,
        "Chain verifier ready"
    );
    if config.stripe.webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; Stripe webhook is disabled");
    }

    let addr = config.bind_addr();
    let state = AppState::new(
        store,
        Arc::new(stripe),
        Arc::new(blockradar),
        Arc::new(verifier),
        Arc::new(Eip191Verifier),
        config,
    );
    let app = router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("binding {addr}: {e}"))?;
    tracing::info!("Paylink server listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Paylink server failed");
            ExitCode::FAILURE
        }
    }
}
