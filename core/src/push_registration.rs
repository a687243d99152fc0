//! Device registration for call wake-up pushes
//!
//! The native push module is an injected [`VoipPushService`] handle built
//! once at process start. The client keeps at most one listener set per
//! event type: every (re)initialization releases the previous handles before
//! attaching new ones.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};

use crate::error::Result;
use crate::models::{Platform, RegistrationState};
use crate::subscription::Subscription;

/// A call action performed through the native call UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCallAction {
    pub call_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    TokenIssued(String),
    CallAnswered(NativeCallAction),
    CallStarted(NativeCallAction),
}

const LISTENER_KINDS: usize = 3;

pub type TokenCallback = Box<dyn Fn(String) + Send + Sync>;
pub type CallActionCallback = Box<dyn Fn(NativeCallAction) + Send + Sync>;

/// Platform push module (PushKit/CallKit bridge on iOS).
#[async_trait]
pub trait VoipPushService: Send + Sync {
    fn platform(&self) -> Platform;

    fn on_token(&self, callback: TokenCallback) -> Result<Subscription>;

    fn on_call_answered(&self, callback: CallActionCallback) -> Result<Subscription>;

    fn on_call_started(&self, callback: CallActionCallback) -> Result<Subscription>;

    /// Ask the platform for a token; it arrives through `on_token`.
    async fn register(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The platform has no wake-up push support. Not an error.
    Unavailable,
    /// Registration requested; the token has not arrived yet.
    Registering,
    Registered(String),
}

struct Inner {
    state: RegistrationState,
    token: Option<String>,
    listeners: Vec<Subscription>,
}

struct Shared {
    inner: Mutex<Inner>,
    events: broadcast::Sender<PushEvent>,
    token: watch::Sender<Option<String>>,
}

impl Shared {
    fn token_issued(&self, token: String) {
        {
            let mut inner = self.inner.lock();
            inner.token = Some(token.clone());
            inner.state = RegistrationState::Registered;
        }
        log::info!("Wake-up push token issued");
        self.token.send_replace(Some(token.clone()));
        let _ = self.events.send(PushEvent::TokenIssued(token));
    }

    fn release_listeners(&self) {
        let listeners = std::mem::take(&mut self.inner.lock().listeners);
        for mut listener in listeners {
            listener.unsubscribe();
        }
    }
}

pub struct PushRegistrationClient {
    service: Arc<dyn VoipPushService>,
    shared: Arc<Shared>,
    init_lock: tokio::sync::Mutex<()>,
}

impl PushRegistrationClient {
    pub fn new(service: Arc<dyn VoipPushService>) -> Self {
        let (events, _) = broadcast::channel(32);
        let (token, _) = watch::channel(None);
        Self {
            service,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: RegistrationState::Unregistered,
                    token: None,
                    listeners: Vec::new(),
                }),
                events,
                token,
            }),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn platform(&self) -> Platform {
        self.service.platform()
    }

    pub fn state(&self) -> RegistrationState {
        self.shared.inner.lock().state
    }

    /// Token issued during this process, if any.
    pub fn token(&self) -> Option<String> {
        self.shared.inner.lock().token.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PushEvent> {
        self.shared.events.subscribe()
    }

    /// Resolves once a token has been issued.
    pub async fn wait_for_token(&self) -> Option<String> {
        let mut rx = self.shared.token.subscribe();
        let token = rx.wait_for(|token| token.is_some()).await.ok()?;
        token.clone()
    }

    pub fn active_listener_count(&self) -> usize {
        self.shared
            .inner
            .lock()
            .listeners
            .iter()
            .filter(|l| l.is_active())
            .count()
    }

    /// Register for wake-up pushes.
    ///
    /// Returns the cached token when already registered, reattaching the
    /// listeners if a teardown released them. Concurrent calls are
    /// serialized, so a single listener set is ever attached.
    pub async fn initialize(&self) -> Result<RegistrationOutcome> {
        let _guard = self.init_lock.lock().await;

        let platform = self.service.platform();
        if !platform.supports_wake_up_push() {
            log::debug!("Wake-up pushes unavailable on {}", platform);
            return Ok(RegistrationOutcome::Unavailable);
        }

        let cached = {
            let inner = self.shared.inner.lock();
            match (inner.state, &inner.token) {
                (RegistrationState::Registered, Some(token)) => Some(token.clone()),
                _ => None,
            }
        };

        if let Some(token) = cached {
            if self.active_listener_count() == LISTENER_KINDS {
                return Ok(RegistrationOutcome::Registered(token));
            }

            // Registered before a teardown: reattach without asking for a new token.
            self.shared.release_listeners();
            let listeners = self.attach_listeners()?;
            self.shared.inner.lock().listeners = listeners;
            log::debug!("Reattached wake-up push listeners");
            return Ok(RegistrationOutcome::Registered(token));
        }

        self.shared.release_listeners();

        let listeners = match self.attach_listeners() {
            Ok(listeners) => listeners,
            Err(e) => {
                self.shared.inner.lock().state = RegistrationState::Unregistered;
                return Err(e);
            }
        };

        {
            let mut inner = self.shared.inner.lock();
            inner.listeners = listeners;
            if inner.state != RegistrationState::Registered {
                inner.state = RegistrationState::Registering;
            }
        }

        if let Err(e) = self.service.register().await {
            log::warn!("Wake-up push registration failed: {}", e);
            self.shared.release_listeners();
            self.shared.inner.lock().state = RegistrationState::Unregistered;
            return Err(e);
        }

        let inner = self.shared.inner.lock();
        match (inner.state, &inner.token) {
            (RegistrationState::Registered, Some(token)) => {
                Ok(RegistrationOutcome::Registered(token.clone()))
            }
            _ => Ok(RegistrationOutcome::Registering),
        }
    }

    /// Release every listener. Release failures are swallowed.
    pub fn teardown(&self) {
        self.shared.release_listeners();
        let mut inner = self.shared.inner.lock();
        if inner.state == RegistrationState::Registering {
            inner.state = RegistrationState::Unregistered;
        }
    }

    fn attach_listeners(&self) -> Result<Vec<Subscription>> {
        let mut listeners = Vec::with_capacity(LISTENER_KINDS);

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        listeners.push(self.service.on_token(Box::new(move |token| {
            if let Some(shared) = weak.upgrade() {
                shared.token_issued(token);
            }
        }))?);

        let weak = Arc::downgrade(&self.shared);
        listeners.push(self.service.on_call_answered(Box::new(move |action| {
            if let Some(shared) = weak.upgrade() {
                log::info!("Call {} answered from native UI", action.call_id);
                let _ = shared.events.send(PushEvent::CallAnswered(action));
            }
        }))?);

        let weak = Arc::downgrade(&self.shared);
        listeners.push(self.service.on_call_started(Box::new(move |action| {
            if let Some(shared) = weak.upgrade() {
                log::info!("Call {} started from native UI", action.call_id);
                let _ = shared.events.send(PushEvent::CallStarted(action));
            }
        }))?);

        Ok(listeners)
    }
}

impl Drop for PushRegistrationClient {
    fn drop(&mut self) {
        self.shared.release_listeners();
    }
}
