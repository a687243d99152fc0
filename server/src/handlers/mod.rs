//! HTTP request handlers for Ringline Server

pub mod health;
pub mod push;
pub mod turn;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{error::AppError, AppState};

/// Caller identity established from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized)?;

        let user_id = state
            .identity
            .verify(bearer.token())
            .await
            .map_err(|e| AppError::Upstream(format!("Identity provider unavailable: {}", e)))?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser { user_id })
    }
}
