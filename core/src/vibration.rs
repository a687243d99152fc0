//! Repeating haptic feedback for ringing calls
//!
//! Platforms only offer a one-shot "vibrate this pattern" primitive. The
//! engine re-issues the selected pattern every time a full cycle has
//! elapsed, which gives a seamless ring buzz until stopped.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Settings key holding the selected pattern name.
pub const VIBRATION_PATTERN_KEY: &str = "call_vibration_pattern";
pub const DEFAULT_PATTERN: &str = "default";

/// Alternating vibrate/pause durations in milliseconds.
const PATTERNS: &[(&str, &[u64])] = &[
    ("default", &[400, 200, 400, 1000]),
    ("heartbeat", &[150, 100, 150, 600]),
    ("pulse", &[200, 200, 200, 200, 200, 1000]),
    ("long", &[1000, 1000]),
    ("staccato", &[100, 100, 100, 100, 100, 100, 100, 1300]),
    ("none", &[]),
];

pub fn pattern_names() -> impl Iterator<Item = &'static str> {
    PATTERNS.iter().map(|(name, _)| *name)
}

/// Pattern for a name; unknown names fall back to the default pattern.
pub fn resolve_pattern(name: &str) -> &'static [u64] {
    PATTERNS
        .iter()
        .find(|(n, _)| *n == name)
        .or_else(|| PATTERNS.iter().find(|(n, _)| *n == DEFAULT_PATTERN))
        .map(|(_, pattern)| *pattern)
        .unwrap_or(&[])
}

pub fn cycle_duration(pattern: &[u64]) -> Duration {
    Duration::from_millis(pattern.iter().sum())
}

pub trait Haptics: Send + Sync {
    fn supports_vibration(&self) -> bool;

    /// Play a pattern once. `[0]` cancels whatever is playing.
    fn vibrate(&self, pattern: &[u64]) -> Result<()>;
}

pub trait PreferenceStore: Send + Sync {
    fn preference(&self, key: &str) -> Option<String>;

    fn set_preference(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibrationState {
    Idle,
    Vibrating,
}

pub struct VibrationEngine {
    haptics: Arc<dyn Haptics>,
    preferences: Arc<dyn PreferenceStore>,
    repeat: Mutex<Option<JoinHandle<()>>>,
}

impl VibrationEngine {
    pub fn new(haptics: Arc<dyn Haptics>, preferences: Arc<dyn PreferenceStore>) -> Self {
        Self {
            haptics,
            preferences,
            repeat: Mutex::new(None),
        }
    }

    pub fn state(&self) -> VibrationState {
        match self.repeat.lock().as_ref() {
            Some(task) if !task.is_finished() => VibrationState::Vibrating,
            _ => VibrationState::Idle,
        }
    }

    /// Selected pattern name, read fresh from preferences.
    pub fn selected_pattern(&self) -> String {
        self.preferences
            .preference(VIBRATION_PATTERN_KEY)
            .unwrap_or_else(|| DEFAULT_PATTERN.to_string())
    }

    /// Start ringing vibration. Returns `false` when nothing was started:
    /// already vibrating, pattern `none`, or no vibration hardware.
    pub fn start_call_vibration(&self) -> bool {
        let mut repeat = self.repeat.lock();
        if matches!(repeat.as_ref(), Some(task) if !task.is_finished()) {
            return false;
        }

        if !self.haptics.supports_vibration() {
            log::debug!("Device cannot vibrate, skipping ring vibration");
            return false;
        }

        let name = self.selected_pattern();
        let pattern = resolve_pattern(&name);
        if pattern.is_empty() {
            log::debug!("Vibration pattern {:?} is silent", name);
            return false;
        }

        let cycle = cycle_duration(pattern);
        let haptics = Arc::clone(&self.haptics);
        log::debug!("Starting {:?} vibration, cycle {:?}", name, cycle);

        *repeat = Some(tokio::spawn(async move {
            loop {
                if let Err(e) = haptics.vibrate(pattern) {
                    log::warn!("Vibration failed: {}", e);
                }
                tokio::time::sleep(cycle).await;
            }
        }));
        true
    }

    /// Cancel the repeat timer and any vibration in progress.
    pub fn stop_vibration(&self) {
        if let Some(task) = self.repeat.lock().take() {
            task.abort();
        }
        if self.haptics.supports_vibration() {
            if let Err(e) = self.haptics.vibrate(&[0]) {
                log::warn!("Failed to cancel vibration: {}", e);
            }
        }
    }

    /// Play one cycle of a pattern, replacing any ringing vibration.
    pub fn preview(&self, name: &str) {
        self.stop_vibration();
        if !self.haptics.supports_vibration() {
            return;
        }
        let pattern = resolve_pattern(name);
        if pattern.is_empty() {
            return;
        }
        if let Err(e) = self.haptics.vibrate(pattern) {
            log::warn!("Vibration preview failed: {}", e);
        }
    }
}

impl Drop for VibrationEngine {
    fn drop(&mut self) {
        self.stop_vibration();
    }
}
