//! Per-call diagnostic event log

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    Ice,
    Sdp,
    Connection,
    Media,
    Error,
    Info,
}

impl DiagnosticCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCategory::Ice => "ice",
            DiagnosticCategory::Sdp => "sdp",
            DiagnosticCategory::Connection => "connection",
            DiagnosticCategory::Media => "media",
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticLogEntry {
    pub timestamp: DateTime<Utc>,
    pub category: DiagnosticCategory,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Append-only event log for one call session.
pub struct DiagnosticRecorder {
    session_id: String,
    clock: Arc<dyn Clock>,
    entries: RwLock<Vec<DiagnosticLogEntry>>,
}

impl DiagnosticRecorder {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            clock,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record(&self, category: DiagnosticCategory, event: &str, details: Option<&str>) {
        let entry = DiagnosticLogEntry {
            timestamp: self.clock.now(),
            category,
            event: event.to_string(),
            details: details.map(str::to_string),
        };
        if category == DiagnosticCategory::Error {
            log::warn!("[call {}] {}: {}", self.session_id, event, details.unwrap_or("-"));
        }
        self.entries.write().push(entry);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn entries(&self) -> Vec<DiagnosticLogEntry> {
        self.entries.read().clone()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.entries.read())?)
    }

    /// Human-readable report of the current log. Pure read.
    pub fn generate_report(&self) -> String {
        let entries = self.entries.read();
        let mut out = String::new();

        let _ = writeln!(out, "=== Call Diagnostics Report ===");
        let _ = writeln!(
            out,
            "Generated: {}",
            self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let _ = writeln!(out, "Session: {}", self.session_id);
        let _ = writeln!(out, "Total events: {}", entries.len());

        let _ = writeln!(out);
        let _ = writeln!(out, "--- Timeline ---");
        for entry in entries.iter() {
            let _ = writeln!(
                out,
                "[{}] [{}] {}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                entry.category.as_str().to_uppercase(),
                entry.event
            );
            if let Some(details) = &entry.details {
                let _ = writeln!(out, "    {}", details);
            }
        }

        let mut counts: BTreeMap<DiagnosticCategory, usize> = BTreeMap::new();
        for entry in entries.iter() {
            *counts.entry(entry.category).or_default() += 1;
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "--- Summary ---");
        for (category, count) in &counts {
            let _ = writeln!(out, "{}: {}", category.as_str(), count);
        }

        let errors: Vec<&DiagnosticLogEntry> = entries
            .iter()
            .filter(|e| e.category == DiagnosticCategory::Error)
            .collect();
        if !errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "--- Errors ---");
            for error in errors {
                let _ = writeln!(
                    out,
                    "- {}: {}",
                    error.event,
                    error.details.as_deref().unwrap_or("(no details)")
                );
            }
        }

        out
    }
}

impl Default for DiagnosticRecorder {
    fn default() -> Self {
        Self::new()
    }
}
