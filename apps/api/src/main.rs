//! Long-term leave group sync composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod state;
mod sync_config;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use leavesync_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, RunMode, init_tracing};
use crate::dto::SyncSummaryResponse;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let app_state = AppState {
        secret_source: api_services::build_secret_source(
            &config.secret_provider,
            http_client.clone(),
        ),
        secret_provider: config.secret_provider.clone(),
        http_client,
        env_lookup: Arc::new(|name: &str| env::var(name).ok()),
    };

    match config.mode {
        RunMode::RunOnce => {
            let summary = api_services::run_sync_invocation(&app_state).await?;
            let output = serde_json::to_string_pretty(&SyncSummaryResponse::from(summary))
                .map_err(|error| {
                    AppError::Internal(format!("failed to serialize sync summary: {error}"))
                })?;
            println!("{output}");
            Ok(())
        }
        RunMode::Serve => {
            let address = config.socket_address()?;
            let app = api_router::build_router(app_state);

            let listener = tokio::net::TcpListener::bind(address)
                .await
                .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

            info!(%address, "leavesync-api listening");

            axum::serve(listener, app)
                .await
                .map_err(|error| AppError::Internal(format!("api server error: {error}")))
        }
    }
}
