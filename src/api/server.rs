use anyhow::{Context, Result};
use tokio::net::TcpListener;

use crate::api::{build_router, AppState};
use crate::infra::AppConfig;

/// Bind `config.bind` and serve until the process is stopped.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    tracing::info!(
        addr = %config.bind,
        backend = ?config.backend,
        mode = ?config.fhir.mode,
        "labsense listening"
    );

    axum::serve(listener, app).await.context("Server error")
}
