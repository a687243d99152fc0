//! Wake-up push dispatch
//!
//! Every defined outcome is reported to the caller as a success-shaped
//! response. Only malformed input and configuration errors surface as
//! [`AppError`]. Delivery is attempted once; retrying is the caller's call.

use chrono::Utc;
use ringline_core::{CallType, PushDispatchRequest, PushDispatchResponse};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    apns::{ProviderPush, PushTransport},
    config::ApnsConfig,
    crypto,
    error::{AppError, Result},
    storage::DeviceDirectory,
};

const UNKNOWN_CALLER: &str = "Unknown caller";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    NoDeviceRegistered,
    UnsupportedPlatform { platform: String },
    ProviderRejected { status: u16, reason: Option<String> },
    ProviderUnreachable { reason: String },
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered)
    }

    pub fn into_response(self) -> PushDispatchResponse {
        let sent = self.is_sent();
        let error = match self {
            DispatchOutcome::Delivered | DispatchOutcome::NoDeviceRegistered => None,
            DispatchOutcome::UnsupportedPlatform { platform } => {
                Some(format!("Wake-up push not supported on {}", platform))
            }
            DispatchOutcome::ProviderRejected { status, reason } => Some(match reason {
                Some(reason) => format!("Push provider rejected request ({}): {}", status, reason),
                None => format!("Push provider rejected request ({})", status),
            }),
            DispatchOutcome::ProviderUnreachable { reason } => {
                Some(format!("Push provider unreachable: {}", reason))
            }
        };

        PushDispatchResponse { sent, error }
    }
}

/// A dispatch request with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPush {
    pub callee_id: String,
    pub caller_id: String,
    pub caller_name: Option<String>,
    pub call_id: String,
    pub call_type: CallType,
}

impl CallPush {
    pub fn from_request(request: PushDispatchRequest) -> Result<Self> {
        let required = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let callee_id = required(request.callee_id);
        let caller_id = required(request.caller_id);
        let call_id = required(request.call_id);

        let mut missing = Vec::new();
        if callee_id.is_none() {
            missing.push("callee_id");
        }
        if caller_id.is_none() {
            missing.push("caller_id");
        }
        if call_id.is_none() {
            missing.push("call_id");
        }

        match (callee_id, caller_id, call_id) {
            (Some(callee_id), Some(caller_id), Some(call_id)) => Ok(Self {
                callee_id,
                caller_id,
                caller_name: required(request.caller_name),
                call_id,
                call_type: CallType::from_is_video(request.is_video.unwrap_or(false)),
            }),
            _ => Err(AppError::BadRequest(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }

    /// Provider payload; the app reads the custom keys to build its call UI.
    pub fn payload(&self) -> Value {
        json!({
            "aps": { "content-available": 1 },
            "callerName": self.caller_name.as_deref().unwrap_or(UNKNOWN_CALLER),
            "callId": self.call_id,
            "callerId": self.caller_id,
            "callType": self.call_type.as_str(),
            "uuid": self.call_id,
        })
    }
}

pub struct PushDispatcher {
    apns: ApnsConfig,
    devices: Arc<dyn DeviceDirectory>,
    transport: Arc<dyn PushTransport>,
}

impl PushDispatcher {
    pub fn new(apns: ApnsConfig, devices: Arc<dyn DeviceDirectory>, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            apns,
            devices,
            transport,
        }
    }

    pub async fn dispatch(&self, request: PushDispatchRequest) -> Result<DispatchOutcome> {
        let push = CallPush::from_request(request)?;

        let registration = match self.devices.find_for_user(&push.callee_id).await? {
            Some(registration) => registration,
            None => {
                tracing::info!("No push registration for {}, skipping call {}", push.callee_id, push.call_id);
                return Ok(DispatchOutcome::NoDeviceRegistered);
            }
        };

        if !registration.platform().is_some_and(|p| p.supports_wake_up_push()) {
            tracing::info!(
                "Callee {} registered on {}, wake-up push not available",
                push.callee_id,
                registration.platform
            );
            return Ok(DispatchOutcome::UnsupportedPlatform {
                platform: registration.platform,
            });
        }

        let credentials = self.apns.credentials().map_err(AppError::NotConfigured)?;
        let authorization = crypto::sign_provider_token(
            &credentials.key_id,
            &credentials.team_id,
            &credentials.private_key_pem,
            Utc::now().timestamp(),
        )
        .map_err(|e| AppError::NotConfigured(format!("APNs signing key is unusable: {}", e)))?;

        let provider_push = ProviderPush {
            endpoint: credentials.environment.endpoint().to_string(),
            device_token: registration.token,
            authorization,
            topic: format!("{}.voip", credentials.bundle_id),
            payload: push.payload(),
        };

        match self.transport.send(provider_push).await {
            Ok(resp) if resp.is_accepted() => {
                tracing::info!("Wake-up push delivered for call {}", push.call_id);
                Ok(DispatchOutcome::Delivered)
            }
            Ok(resp) => {
                tracing::warn!(
                    "Push provider rejected call {}: {} {:?}",
                    push.call_id,
                    resp.status,
                    resp.reason
                );
                Ok(DispatchOutcome::ProviderRejected {
                    status: resp.status,
                    reason: resp.reason,
                })
            }
            Err(e) => {
                tracing::warn!("Push provider unreachable for call {}: {}", push.call_id, e);
                Ok(DispatchOutcome::ProviderUnreachable { reason: e.to_string() })
            }
        }
    }
}
