//! Releasable handles for listeners and change streams

use crate::error::Result;

type ReleaseFn = Box<dyn FnOnce() -> Result<()> + Send>;

/// Handle for one registered listener or change stream.
///
/// `unsubscribe` runs the release hook at most once. Release failures are
/// logged and swallowed; dropping the handle releases it as well.
pub struct Subscription {
    label: String,
    release: Option<ReleaseFn>,
}

impl Subscription {
    pub fn new<F>(label: impl Into<String>, release: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self {
            label: label.into(),
            release: Some(Box::new(release)),
        }
    }

    /// A handle with nothing to release.
    pub fn noop(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            release: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            if let Err(e) = release() {
                log::debug!("Ignoring release failure for {}: {}", self.label, e);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}
