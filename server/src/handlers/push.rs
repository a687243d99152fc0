//! Wake-up push handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use ringline_core::{PushDispatchRequest, PushDispatchResponse, RegisterPushTokenRequest};
use serde_json::{json, Value};

use crate::{
    error::{AppError, Result},
    AppState,
};

use super::AuthUser;

/// Wake the callee's device for an incoming call.
///
/// Every outcome short of malformed input or missing signing credentials
/// answers 200 with `{sent, error?}`.
pub async fn send_call_push(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PushDispatchRequest>, JsonRejection>,
) -> Result<Json<PushDispatchResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let outcome = state.dispatcher.dispatch(request).await?;
    Ok(Json(outcome.into_response()))
}

/// Store the caller's wake-up push token.
pub async fn register_token(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: std::result::Result<Json<RegisterPushTokenRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let token = request.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("Push token must not be empty".to_string()));
    }

    state
        .devices
        .upsert_registration(&auth.user_id, request.platform, token)
        .await?;

    tracing::info!("Registered {} push token for {}", request.platform, auth.user_id);

    Ok(Json(json!({ "registered": true })))
}
