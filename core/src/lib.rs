//! Ringline Core Library
//!
//! Client side of call signaling: incoming call detection, wake-up push
//! registration, and the audio, vibration and diagnostic side effects of a
//! call session.

pub mod audio;
pub mod detector;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod network;
pub mod push_registration;
pub mod session;
pub mod storage;
pub mod store;
pub mod subscription;
pub mod vibration;

pub use audio::{AudioRoute, AudioRouteController, OutputSink};
pub use detector::{DetectorConfig, IncomingCallDetector};
pub use diagnostics::{DiagnosticCategory, DiagnosticLogEntry, DiagnosticRecorder};
pub use error::*;
pub use models::*;
pub use network::ApiClient;
pub use push_registration::{PushEvent, PushRegistrationClient, RegistrationOutcome, VoipPushService};
pub use session::{CallDirection, CallSession};
pub use storage::LocalStorage;
pub use store::{CallChange, CallRecordStore, ChangeStream, InMemoryCallStore, ProfileLookup};
pub use subscription::Subscription;
pub use vibration::{Haptics, PreferenceStore, VibrationEngine, VibrationState};

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub server_host: String,
    pub server_port: u16,
    pub use_tls: bool,
}

impl ClientConfig {
    pub fn new(host: &str, port: u16, use_tls: bool) -> Self {
        Self {
            server_host: host.to_string(),
            server_port: port,
            use_tls,
        }
    }

    pub fn http_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.server_host, self.server_port)
    }
}
