//! Incoming call detection
//!
//! Reconciles the call record store with the single incoming-call view shown
//! on this device. Two independent paths feed the reconciliation: a catch-up
//! query issued on every activation, and a live change stream. Either path
//! may be late, duplicated or missing entirely; the detector stays correct
//! with the catch-up query alone.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::{CallRecord, CallerProfile, IncomingCallView};
use crate::store::{CallChange, CallRecordStore, ProfileLookup};
use crate::subscription::Subscription;

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Shown when the caller's profile is missing or has no name.
    pub unknown_caller_name: String,
    /// Avatar service used for callers without an avatar; the caller id is
    /// passed as the `seed` query parameter.
    pub placeholder_avatar_base: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            unknown_caller_name: "Unknown caller".to_string(),
            placeholder_avatar_base: "https://api.dicebear.com/7.x/initials/svg".to_string(),
        }
    }
}

/// Deterministic placeholder avatar for a caller.
pub fn placeholder_avatar(base: &str, caller_id: &str) -> String {
    match url::Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("seed", caller_id);
            url.to_string()
        }
        Err(_) => format!("{}?seed={}", base, caller_id),
    }
}

/// Most settled ids remembered. Older ids are forgotten; a late duplicate for
/// one of them is still rejected by the store status check.
const SETTLED_CAPACITY: usize = 256;

/// Bounded set of call ids that must not be displayed again.
#[derive(Default)]
struct SettledCalls {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl SettledCalls {
    fn contains(&self, call_id: &str) -> bool {
        self.ids.contains(call_id)
    }

    fn insert(&mut self, call_id: String) {
        if !self.ids.insert(call_id.clone()) {
            return;
        }
        self.order.push_back(call_id);
        while self.order.len() > SETTLED_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// The published call.
struct Displayed {
    call_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct DetectorState {
    displayed: Option<Displayed>,
    /// Calls observed leaving pending/ringing, or dismissed manually.
    settled: SettledCalls,
    /// Bumped by a manual clear; hydrations started earlier are dropped.
    epoch: u64,
    active: bool,
}

pub struct IncomingCallDetector {
    party_id: String,
    store: Arc<dyn CallRecordStore>,
    profiles: Arc<dyn ProfileLookup>,
    config: DetectorConfig,
    state: Mutex<DetectorState>,
    view: watch::Sender<Option<IncomingCallView>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl IncomingCallDetector {
    pub fn new(
        party_id: &str,
        store: Arc<dyn CallRecordStore>,
        profiles: Arc<dyn ProfileLookup>,
        config: DetectorConfig,
    ) -> Arc<Self> {
        let (view, _) = watch::channel(None);
        Arc::new(Self {
            party_id: party_id.to_string(),
            store,
            profiles,
            config,
            state: Mutex::new(DetectorState::default()),
            view,
            tasks: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        })
    }

    pub fn party_id(&self) -> &str {
        &self.party_id
    }

    /// Receiver that observes every change to the displayed call.
    pub fn watch(&self) -> watch::Receiver<Option<IncomingCallView>> {
        self.view.subscribe()
    }

    pub fn current(&self) -> Option<IncomingCallView> {
        self.view.borrow().clone()
    }

    /// Start the catch-up query and the live subscription.
    ///
    /// The two run concurrently and neither waits for the other. Calling
    /// `activate` again re-runs the catch-up query and replaces the
    /// subscription.
    pub fn activate(self: &Arc<Self>) {
        self.release_resources();
        self.state.lock().active = true;

        log::info!("Activating incoming call detection for {}", self.party_id);

        let weak = Arc::downgrade(self);
        let catch_up = tokio::spawn(async move {
            let Some(this) = weak.upgrade() else { return };
            if let Err(e) = this.catch_up().await {
                log::warn!("Catch-up query for {} failed: {}", this.party_id, e);
            }
        });

        let weak = Arc::downgrade(self);
        let live = tokio::spawn(Self::run_subscription(weak));

        self.tasks.lock().extend([catch_up, live]);
    }

    /// Fetch the most recent ringing call and reconcile it.
    pub async fn catch_up(&self) -> Result<()> {
        match self.store.latest_ringing_call(&self.party_id).await? {
            Some(record) => {
                log::debug!("Catch-up found ringing call {}", record.id);
                self.present(record).await;
            }
            None => log::debug!("Catch-up found no ringing call for {}", self.party_id),
        }
        Ok(())
    }

    /// Apply one change notification.
    pub async fn handle_change(&self, change: CallChange) {
        let record = change.into_record();
        if record.callee_id != self.party_id {
            return;
        }

        if record.status.is_ringing() {
            self.present(record).await;
        } else {
            self.settle(&record.id);
        }
    }

    /// Dismiss the displayed call.
    ///
    /// Hydrations already in flight are discarded, so a clear is never undone
    /// by a late result. A later event for a different call displays normally.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        if let Some(displayed) = state.displayed.take() {
            log::debug!("Manually cleared incoming call {}", displayed.call_id);
            state.settled.insert(displayed.call_id);
        }
        self.view.send_replace(None);
    }

    /// Stop the live subscription and any in-flight work. Idempotent.
    pub fn deactivate(&self) {
        let was_active = std::mem::take(&mut self.state.lock().active);
        self.release_resources();
        if was_active {
            log::info!("Deactivated incoming call detection for {}", self.party_id);
        }
    }

    async fn run_subscription(weak: Weak<Self>) {
        let (store, party_id) = match weak.upgrade() {
            Some(this) => (Arc::clone(&this.store), this.party_id.clone()),
            None => return,
        };

        let stream = match store.subscribe(&party_id).await {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("Live call subscription for {} failed: {}", party_id, e);
                return;
            }
        };

        let mut events = stream.events;
        match weak.upgrade() {
            Some(this) => this.attach_subscription(stream.subscription),
            None => return,
        }

        while let Some(change) = events.recv().await {
            let Some(this) = weak.upgrade() else { break };
            this.handle_change(change).await;
        }

        log::debug!("Live call subscription for {} closed", party_id);
    }

    fn attach_subscription(&self, mut subscription: Subscription) {
        if !self.state.lock().active {
            subscription.unsubscribe();
            return;
        }
        if let Some(mut previous) = self.subscription.lock().replace(subscription) {
            previous.unsubscribe();
        }
    }

    fn release_resources(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        if let Some(mut subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
    }

    async fn present(&self, record: CallRecord) {
        let epoch = {
            let state = self.state.lock();
            if state.settled.contains(&record.id) {
                return;
            }
            state.epoch
        };

        let view = self.hydrate(record).await;
        let call_id = view.record.id.clone();
        let created_at = view.record.created_at;

        // The store is the source of truth; the event may already be stale.
        match self.store.call_status(&call_id).await {
            Ok(Some(status)) if !status.is_ringing() => {
                log::debug!("Discarding call {} which is already {}", call_id, status);
                self.settle(&call_id);
                return;
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                log::debug!("Discarding call {} which no longer exists", call_id);
                return;
            }
            Err(e) => {
                log::warn!("Status check for call {} failed, trusting event: {}", call_id, e);
            }
        }

        let mut state = self.state.lock();
        if state.epoch != epoch || state.settled.contains(&call_id) {
            return;
        }

        if let Some(previous) = &state.displayed {
            if previous.call_id != call_id {
                // A slow hydration must not replace a newer call.
                if previous.created_at > created_at {
                    log::debug!(
                        "Discarding call {} which is older than displayed call {}",
                        call_id,
                        previous.call_id
                    );
                    return;
                }
                log::info!("Incoming call {} supersedes {}", call_id, previous.call_id);
            }
        }

        state.displayed = Some(Displayed { call_id, created_at });
        self.view.send_replace(Some(view));
    }

    fn settle(&self, call_id: &str) {
        let mut state = self.state.lock();
        state.settled.insert(call_id.to_string());
        if state.displayed.as_ref().is_some_and(|d| d.call_id == call_id) {
            state.displayed = None;
            self.view.send_replace(None);
            log::debug!("Incoming call {} is no longer ringing", call_id);
        }
    }

    async fn hydrate(&self, record: CallRecord) -> IncomingCallView {
        let profile = match self.profiles.profile(&record.caller_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => CallerProfile::default(),
            Err(e) => {
                log::warn!("Profile lookup for caller {} failed: {}", record.caller_id, e);
                CallerProfile::default()
            }
        };

        let caller_name = profile
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.config.unknown_caller_name.clone());
        let caller_avatar = profile
            .avatar_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| {
                placeholder_avatar(&self.config.placeholder_avatar_base, &record.caller_id)
            });

        IncomingCallView {
            record,
            caller_name,
            caller_avatar,
        }
    }
}

impl Drop for IncomingCallDetector {
    fn drop(&mut self) {
        self.release_resources();
    }
}
