//! Earpiece / loudspeaker routing for call audio

use std::sync::Arc;

use crate::error::Result;
use crate::models::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioRoute {
    #[default]
    Earpiece,
    Speaker,
}

impl AudioRoute {
    pub fn toggled(self) -> Self {
        match self {
            AudioRoute::Earpiece => AudioRoute::Speaker,
            AudioRoute::Speaker => AudioRoute::Earpiece,
        }
    }
}

/// An attached audio output (remote track element, playback sink, ...).
pub trait OutputSink: Send + Sync {
    fn set_volume(&self, volume: f32) -> Result<()>;
}

/// Output level for a route on a platform.
///
/// Platforms differ only in magnitude; the earpiece is always quieter than
/// the speaker.
pub fn volume_for(platform: Platform, route: AudioRoute) -> f32 {
    match (platform, route) {
        (_, AudioRoute::Speaker) => 1.0,
        (Platform::Ios, AudioRoute::Earpiece) => 0.3,
        (Platform::Android, AudioRoute::Earpiece) => 0.5,
        (_, AudioRoute::Earpiece) => 0.7,
    }
}

pub struct AudioRouteController {
    platform: Platform,
    route: AudioRoute,
    sinks: Vec<Arc<dyn OutputSink>>,
}

impl AudioRouteController {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            route: AudioRoute::default(),
            sinks: Vec::new(),
        }
    }

    pub fn route(&self) -> AudioRoute {
        self.route
    }

    pub fn is_speaker(&self) -> bool {
        self.route == AudioRoute::Speaker
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Track a new output and apply the current policy to it.
    pub fn attach(&mut self, sink: Arc<dyn OutputSink>) {
        self.apply_to(sink.as_ref());
        self.sinks.push(sink);
    }

    /// Flip between earpiece and speaker, re-applying policy to every sink.
    pub fn toggle(&mut self) -> AudioRoute {
        self.route = self.route.toggled();
        log::debug!("Audio route switched to {:?}", self.route);
        for sink in &self.sinks {
            self.apply_to(sink.as_ref());
        }
        self.route
    }

    /// Release all tracked sinks.
    pub fn teardown(&mut self) {
        self.sinks.clear();
    }

    fn apply_to(&self, sink: &dyn OutputSink) {
        let volume = volume_for(self.platform, self.route);
        if let Err(e) = sink.set_volume(volume) {
            log::warn!("Failed to apply {:?} volume: {}", self.route, e);
        }
    }
}

impl Drop for AudioRouteController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        volumes: Mutex<Vec<f32>>,
    }

    impl OutputSink for RecordingSink {
        fn set_volume(&self, volume: f32) -> Result<()> {
            self.volumes.lock().push(volume);
            Ok(())
        }
    }

    struct DetachedSink;

    impl OutputSink for DetachedSink {
        fn set_volume(&self, _volume: f32) -> Result<()> {
            Err(Error::Platform("sink detached".into()))
        }
    }

    #[test]
    fn test_defaults_to_earpiece() {
        let controller = AudioRouteController::new(Platform::Ios);
        assert_eq!(controller.route(), AudioRoute::Earpiece);
        assert!(!controller.is_speaker());
    }

    #[test]
    fn test_toggle_applies_to_every_sink() {
        let mut controller = AudioRouteController::new(Platform::Android);
        let first = Arc::new(RecordingSink::default());
        let second = Arc::new(RecordingSink::default());

        controller.attach(first.clone());
        controller.attach(second.clone());
        assert_eq!(controller.toggle(), AudioRoute::Speaker);
        assert_eq!(controller.toggle(), AudioRoute::Earpiece);

        assert_eq!(*first.volumes.lock(), vec![0.5, 1.0, 0.5]);
        assert_eq!(*second.volumes.lock(), vec![0.5, 1.0, 0.5]);
    }

    #[test]
    fn test_speaker_is_louder_on_every_platform() {
        for platform in [Platform::Ios, Platform::Android, Platform::Web, Platform::Desktop] {
            assert!(
                volume_for(platform, AudioRoute::Earpiece) < volume_for(platform, AudioRoute::Speaker)
            );
        }
    }

    #[test]
    fn test_sink_failure_does_not_abort_toggle() {
        let mut controller = AudioRouteController::new(Platform::Web);
        let healthy = Arc::new(RecordingSink::default());
        controller.attach(Arc::new(DetachedSink));
        controller.attach(healthy.clone());

        controller.toggle();
        assert_eq!(*healthy.volumes.lock(), vec![0.7, 1.0]);

        controller.teardown();
        assert_eq!(controller.sink_count(), 0);
    }
}
