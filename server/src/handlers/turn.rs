//! Relay credential handler for WebRTC

use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    error::{AppError, Result},
    relay, AppState,
};

use super::AuthUser;

/// Fresh relay credentials from the upstream provider, passed through as
/// `{"iceServers": [...]}`. Nothing is cached.
pub async fn get_credentials(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Value>> {
    let api_key = state
        .config
        .relay
        .api_key()
        .ok_or_else(|| AppError::NotConfigured("Relay provider API key is not configured".to_string()))?;

    let upstream = state
        .relay
        .fetch_ice_servers(&api_key)
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to fetch relay credentials: {}", e)))?;

    tracing::debug!("Issued relay credentials to {}", auth.user_id);

    Ok(Json(relay::ice_servers_body(upstream)))
}
