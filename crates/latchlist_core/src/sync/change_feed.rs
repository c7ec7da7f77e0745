//! Push-based change notifications for task storage.
//!
//! # Responsibility
//! - Track subscribers per identity.
//! - Fan out "something changed" events after successful mutations.
//!
//! # Invariants
//! - Callbacks run outside the registry lock.
//! - A callback fires for every change to its identity's rows, including
//!   changes the subscriber itself made.

use crate::model::identity::Identity;
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle returned by `subscribe`, used to cancel one subscription.
pub type SubscriptionId = u64;

type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct FeedState {
    next_id: SubscriptionId,
    subscribers: BTreeMap<SubscriptionId, (Identity, ChangeCallback)>,
}

/// Subscriber registry for task change events.
///
/// Shared by handle: every repository over the same storage must notify
/// through the same feed for cross-subscriber propagation to work.
#[derive(Default)]
pub struct ChangeFeed {
    state: Mutex<FeedState>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback invoked on every change to `identity` rows.
    pub fn subscribe(
        &self,
        identity: Identity,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.insert(id, (identity, Arc::new(callback)));
        id
    }

    /// Cancels one subscription. Returns false when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock().subscribers.remove(&id).is_some()
    }

    /// Invokes every callback subscribed to `identity`.
    pub fn notify(&self, identity: Identity) {
        let callbacks: Vec<ChangeCallback> = self
            .lock()
            .subscribers
            .values()
            .filter(|(subscribed, _)| *subscribed == identity)
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        debug!(
            "event=change_notify module=change_feed status=ok subscribers={}",
            callbacks.len()
        );
        for callback in callbacks {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
