//! Data models for Ringline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ============================================================================
// Call Records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Voice,
    Video,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Voice => "voice",
            CallType::Video => "video",
        }
    }

    pub fn from_is_video(is_video: bool) -> Self {
        if is_video {
            CallType::Video
        } else {
            CallType::Voice
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Pending,
    Ringing,
    Active,
    Ended,
    Missed,
}

impl CallStatus {
    /// Whether the call is still waiting to be picked up.
    pub fn is_ringing(&self) -> bool {
        matches!(self, CallStatus::Pending | CallStatus::Ringing)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, CallStatus::Ended | CallStatus::Missed)
    }

    /// Status only moves forward: once a record leaves pending/ringing it
    /// never re-enters them, and finished records stay finished.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        use CallStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Pending, _) => true,
            (Ringing, Pending) => false,
            (Ringing, _) => true,
            (Active, Ended) | (Active, Missed) => true,
            (Active, _) => false,
            (Ended, _) | (Missed, _) => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::Ringing => "ringing",
            CallStatus::Active => "active",
            CallStatus::Ended => "ended",
            CallStatus::Missed => "missed",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    pub caller_id: String,
    pub callee_id: String,
    pub chat_id: String,
    pub call_type: CallType,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
}

/// Display metadata for a party, as returned by the profile lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallerProfile {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A ringing call enriched with the caller's display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingCallView {
    pub record: CallRecord,
    pub caller_name: String,
    pub caller_avatar: String,
}

impl IncomingCallView {
    pub fn call_id(&self) -> &str {
        &self.record.id
    }

    pub fn is_video(&self) -> bool {
        self.record.call_type == CallType::Video
    }
}

// ============================================================================
// Devices
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ios,
    Android,
    Web,
    Desktop,
}

impl Platform {
    /// Only iOS devices accept call wake-up (VoIP) pushes.
    pub fn supports_wake_up_push(&self) -> bool {
        matches!(self, Platform::Ios)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
            Platform::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "web" => Ok(Platform::Web),
            "desktop" => Ok(Platform::Desktop),
            other => Err(Error::InvalidRequest(format!("unknown platform: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Unregistered,
    Registering,
    Registered,
}

// ============================================================================
// Push Dispatch API
// ============================================================================

/// Body of `POST /api/v1/push/call`.
///
/// Required fields are optional here so that a malformed request reaches
/// validation instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushDispatchRequest {
    pub callee_id: Option<String>,
    pub caller_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_name: Option<String>,
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_video: Option<bool>,
}

impl PushDispatchRequest {
    pub fn new(callee_id: &str, caller_id: &str, call_id: &str) -> Self {
        Self {
            callee_id: Some(callee_id.to_string()),
            caller_id: Some(caller_id.to_string()),
            caller_name: None,
            call_id: Some(call_id.to_string()),
            is_video: None,
        }
    }

    pub fn with_caller_name(mut self, name: &str) -> Self {
        self.caller_name = Some(name.to_string());
        self
    }

    pub fn video(mut self, is_video: bool) -> Self {
        self.is_video = Some(is_video);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushDispatchResponse {
    pub sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPushTokenRequest {
    pub platform: Platform,
    pub token: String,
}

// ============================================================================
// Relay Credentials
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IceUrls {
    One(String),
    Many(Vec<String>),
}

impl IceUrls {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            IceUrls::One(url) => vec![url.clone()],
            IceUrls::Many(urls) => urls.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: IceUrls,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayCredentialsResponse {
    #[serde(rename = "iceServers")]
    pub ice_servers: Vec<IceServer>,
}

/// Relay servers issued for a single call attempt.
///
/// Not `Clone`. The media layer consumes a lease and the next call fetches
/// a fresh one.
#[derive(Debug)]
pub struct RelayCredentialLease {
    ice_servers: Vec<IceServer>,
    issued_at: DateTime<Utc>,
}

impl RelayCredentialLease {
    pub fn new(ice_servers: Vec<IceServer>) -> Self {
        Self {
            ice_servers,
            issued_at: Utc::now(),
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn ice_servers(&self) -> &[IceServer] {
        &self.ice_servers
    }

    pub fn into_ice_servers(self) -> Vec<IceServer> {
        self.ice_servers
    }
}
