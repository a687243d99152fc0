//! Call record store and profile lookup interfaces
//!
//! The durable call table lives in the managed backend. The core only needs
//! a point query, a status read and a change stream, so those are expressed
//! as traits; [`InMemoryCallStore`] backs tests and local embedding.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::models::{CallRecord, CallStatus, CallerProfile};
use crate::subscription::Subscription;

/// A change notification for one call record.
#[derive(Debug, Clone, PartialEq)]
pub enum CallChange {
    Created(CallRecord),
    Updated(CallRecord),
}

impl CallChange {
    pub fn record(&self) -> &CallRecord {
        match self {
            CallChange::Created(record) | CallChange::Updated(record) => record,
        }
    }

    pub fn into_record(self) -> CallRecord {
        match self {
            CallChange::Created(record) | CallChange::Updated(record) => record,
        }
    }
}

/// Live change stream plus the handle that tears it down.
pub struct ChangeStream {
    pub events: mpsc::UnboundedReceiver<CallChange>,
    pub subscription: Subscription,
}

#[async_trait]
pub trait CallRecordStore: Send + Sync {
    /// Most recent record addressed to `callee_id` whose status is pending
    /// or ringing (ordered by `created_at` descending, limit one).
    async fn latest_ringing_call(&self, callee_id: &str) -> Result<Option<CallRecord>>;

    /// Current status of a record, `None` if it does not exist.
    async fn call_status(&self, call_id: &str) -> Result<Option<CallStatus>>;

    /// Creation and update events for records addressed to `callee_id`.
    async fn subscribe(&self, callee_id: &str) -> Result<ChangeStream>;
}

#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Option<CallerProfile>>;
}

// ============================================================================
// In-memory store
// ============================================================================

struct Subscriber {
    id: u64,
    callee_id: String,
    sender: mpsc::UnboundedSender<CallChange>,
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<String, CallRecord>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryCallStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: CallRecord) {
        let mut inner = self.inner.lock();
        inner.records.insert(record.id.clone(), record.clone());
        Self::notify(&mut inner, CallChange::Created(record));
    }

    pub fn update_status(&self, call_id: &str, status: CallStatus) -> Result<CallRecord> {
        let mut inner = self.inner.lock();
        let record = inner
            .records
            .get_mut(call_id)
            .ok_or_else(|| Error::Store(format!("no call record {}", call_id)))?;

        if !record.status.can_transition_to(status) {
            return Err(Error::IllegalTransition {
                from: record.status.to_string(),
                to: status.to_string(),
            });
        }

        record.status = status;
        let updated = record.clone();
        Self::notify(&mut inner, CallChange::Updated(updated.clone()));
        Ok(updated)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    fn notify(inner: &mut StoreInner, change: CallChange) {
        let callee_id = change.record().callee_id.clone();
        inner.subscribers.retain(|sub| {
            if sub.callee_id != callee_id {
                return true;
            }
            sub.sender.send(change.clone()).is_ok()
        });
    }
}

#[async_trait]
impl CallRecordStore for InMemoryCallStore {
    async fn latest_ringing_call(&self, callee_id: &str) -> Result<Option<CallRecord>> {
        let inner = self.inner.lock();
        Ok(inner
            .records
            .values()
            .filter(|r| r.callee_id == callee_id && r.status.is_ringing())
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn call_status(&self, call_id: &str) -> Result<Option<CallStatus>> {
        Ok(self.inner.lock().records.get(call_id).map(|r| r.status))
    }

    async fn subscribe(&self, callee_id: &str) -> Result<ChangeStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner.subscribers.push(Subscriber {
                id,
                callee_id: callee_id.to_string(),
                sender: tx,
            });
            id
        };

        let inner = Arc::clone(&self.inner);
        let subscription = Subscription::new(format!("calls:{}", callee_id), move || {
            inner.lock().subscribers.retain(|sub| sub.id != id);
            Ok(())
        });

        Ok(ChangeStream {
            events: rx,
            subscription,
        })
    }
}
