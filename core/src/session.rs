//! Call session side effects
//!
//! Vibration, audio routing and diagnostics observe the call lifecycle; they
//! never drive each other. A session applies status changes to all three and
//! releases everything once the call is over.

use std::sync::Arc;

use crate::audio::{AudioRoute, AudioRouteController, OutputSink};
use crate::diagnostics::{DiagnosticCategory, DiagnosticRecorder};
use crate::error::{Error, Result};
use crate::models::{CallStatus, Platform};
use crate::vibration::VibrationEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    Incoming,
    Outgoing,
}

pub struct CallSession {
    call_id: String,
    direction: CallDirection,
    status: CallStatus,
    vibration: Arc<VibrationEngine>,
    audio: AudioRouteController,
    diagnostics: DiagnosticRecorder,
    released: bool,
}

impl CallSession {
    pub fn new(
        call_id: &str,
        direction: CallDirection,
        platform: Platform,
        vibration: Arc<VibrationEngine>,
    ) -> Self {
        Self::with_recorder(call_id, direction, platform, vibration, DiagnosticRecorder::new())
    }

    pub fn with_recorder(
        call_id: &str,
        direction: CallDirection,
        platform: Platform,
        vibration: Arc<VibrationEngine>,
        diagnostics: DiagnosticRecorder,
    ) -> Self {
        diagnostics.record(
            DiagnosticCategory::Info,
            "session created",
            Some(&format!("call {} ({:?})", call_id, direction)),
        );
        Self {
            call_id: call_id.to_string(),
            direction,
            status: CallStatus::Pending,
            vibration,
            audio: AudioRouteController::new(platform),
            diagnostics,
            released: false,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn diagnostics(&self) -> &DiagnosticRecorder {
        &self.diagnostics
    }

    pub fn audio_route(&self) -> AudioRoute {
        self.audio.route()
    }

    /// Move the session to `next`, applying side effects for the new state.
    pub fn apply_status(&mut self, next: CallStatus) -> Result<()> {
        if next == self.status && !(next.is_ringing() && self.direction == CallDirection::Incoming) {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            self.diagnostics.record(
                DiagnosticCategory::Error,
                "illegal status transition",
                Some(&format!("{} -> {}", self.status, next)),
            );
            return Err(Error::IllegalTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        let previous = self.status;
        self.status = next;
        self.diagnostics.record(
            DiagnosticCategory::Connection,
            "status changed",
            Some(&format!("{} -> {}", previous, next)),
        );

        match next {
            CallStatus::Pending | CallStatus::Ringing => {
                if self.direction == CallDirection::Incoming && self.vibration.start_call_vibration() {
                    self.diagnostics.record(DiagnosticCategory::Info, "ring vibration started", None);
                }
            }
            CallStatus::Active => {
                self.vibration.stop_vibration();
            }
            CallStatus::Ended | CallStatus::Missed => self.teardown(),
        }

        Ok(())
    }

    pub fn attach_output(&mut self, sink: Arc<dyn OutputSink>) {
        self.audio.attach(sink);
        self.diagnostics.record(DiagnosticCategory::Media, "output attached", None);
    }

    pub fn toggle_speaker(&mut self) -> AudioRoute {
        let route = self.audio.toggle();
        self.diagnostics.record(
            DiagnosticCategory::Media,
            "audio route changed",
            Some(&format!("{:?}", route)),
        );
        route
    }

    /// Release vibration and audio resources. Idempotent.
    pub fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.vibration.stop_vibration();
        self.audio.teardown();
        self.diagnostics.record(DiagnosticCategory::Info, "session released", None);
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
