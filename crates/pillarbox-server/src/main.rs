use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, routing::get, Json, Router};
use clap::Parser;
use pillarbox_core::engine::SimulatedEngineFactory;
use pillarbox_core::view::HeadlessSurfaceFactory;
use pillarbox_core::Bridge;
use pillarbox_ws::GatewayState;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

const DEFAULT_LOG_FILTER: &str = "pillarbox=info,tower_http=debug,wire=info";

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = config::Config::load(&args.config)?;
    // CLI --bind overrides config file
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    let bridge_config = config.bridge_config();
    let namespaces = bridge_config.namespaces.clone();
    let bridge = Arc::new(Bridge::new(
        bridge_config,
        Arc::new(SimulatedEngineFactory::new(config.simulated_media())),
        Arc::new(HeadlessSurfaceFactory),
    ));

    let state = GatewayState {
        bridge: bridge.clone(),
        settings: config.gateway_settings(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .merge(pillarbox_ws::channel_router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        control_channel = %namespaces.control,
        view_channel = %namespaces.view,
        duplicate_policy = ?config.bridge.duplicate_policy,
        "pillarbox bridge listening on ws://{}/channel",
        config.server.bind_address
    );

    let shutdown_signal = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down (ctrl-c)...");
        }
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    bridge.shutdown().await;
    Ok(())
}

async fn health(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "live_sessions": state.bridge.registry().len().await,
        "views": state.bridge.views().len().await,
    }))
}
