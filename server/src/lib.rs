//! Ringline Server
//!
//! Stateless request handlers for call signaling:
//! - Wake-up push dispatch to a callee's registered device
//! - Device push token registration
//! - Relay (TURN) credential brokering

pub mod apns;
pub mod config;
pub mod crypto;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod relay;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::apns::{ApnsTransport, PushTransport};
use crate::config::Config;
use crate::dispatcher::PushDispatcher;
use crate::identity::{HttpTokenVerifier, TokenVerifier};
use crate::relay::{HttpRelayProvider, RelayProvider};
use crate::storage::{DeviceDirectory, Storage};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub devices: Arc<dyn DeviceDirectory>,
    pub dispatcher: Arc<PushDispatcher>,
    pub relay: Arc<dyn RelayProvider>,
    pub identity: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        devices: Arc<dyn DeviceDirectory>,
        transport: Arc<dyn PushTransport>,
        relay: Arc<dyn RelayProvider>,
        identity: Arc<dyn TokenVerifier>,
    ) -> Self {
        let dispatcher = Arc::new(PushDispatcher::new(
            config.apns.clone(),
            Arc::clone(&devices),
            transport,
        ));

        Self {
            config,
            devices,
            dispatcher,
            relay,
            identity,
        }
    }

    /// Production wiring: SQLite directory and HTTP upstream clients.
    pub async fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let storage = Storage::new(&config.storage.database_path).await?;
        let transport = ApnsTransport::new()?;
        let relay = HttpRelayProvider::new(&config.relay.provider_url)?;
        let identity = HttpTokenVerifier::new(&config.auth.url, config.auth.api_key.clone())?;

        Ok(Self::new(
            config,
            Arc::new(storage),
            Arc::new(transport),
            Arc::new(relay),
            Arc::new(identity),
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))

        // Wake-up push
        .route("/api/v1/push/call", post(handlers::push::send_call_push))
        .route("/api/v1/push/register", post(handlers::push::register_token))

        // TURN credentials
        .route("/api/v1/turn/credentials", get(handlers::turn::get_credentials))

        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
