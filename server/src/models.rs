//! Data models for Ringline Server

use ringline_core::Platform;
use serde::{Deserialize, Serialize};

/// A device that asked to be woken for incoming calls.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceRegistration {
    pub user_id: String,
    pub platform: String,
    pub token: String,
    pub updated_at: String,
}

impl DeviceRegistration {
    /// Parsed platform, `None` for a value this build does not know.
    pub fn platform(&self) -> Option<Platform> {
        self.platform.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
