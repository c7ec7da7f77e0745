//! Eventually consistent in-memory mirror of one identity's tasks.
//!
//! # Responsibility
//! - Keep a local snapshot refreshed from task storage.
//! - Apply local mutations through the repository and re-read afterwards.
//!
//! # Invariants
//! - Reconciliation always re-lists the full set. The refresh is O(n) per
//!   change, acceptable at personal-list size; larger data sets would need
//!   incremental patching, and tests to match, before switching.
//! - Change callbacks only raise a flag. Storage access stays on the
//!   caller's thread and happens at the next reconcile tick.

use crate::model::identity::Identity;
use crate::model::task::{Task, TaskId};
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoResult;
use crate::sync::change_feed::SubscriptionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snapshot view selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

/// Aggregate counts over the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskCounts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

/// Local mirror of one identity's tasks, kept consistent with storage
/// through write-through mutations and change-feed reconciliation.
pub struct TaskSyncEngine<R: TaskRepository> {
    repo: R,
    identity: Identity,
    snapshot: Vec<Task>,
    dirty: Arc<AtomicBool>,
    subscription: Option<SubscriptionId>,
}

impl<R: TaskRepository> TaskSyncEngine<R> {
    /// Creates a detached engine with an empty snapshot.
    pub fn new(repo: R, identity: Identity) -> Self {
        Self {
            repo,
            identity,
            snapshot: Vec::new(),
            dirty: Arc::new(AtomicBool::new(false)),
            subscription: None,
        }
    }

    /// Subscribes to the change feed and loads the initial snapshot.
    ///
    /// Attaching twice is a no-op for the subscription; the snapshot is
    /// refreshed either way.
    pub fn attach(&mut self) -> RepoResult<()> {
        if self.subscription.is_none() {
            let dirty = Arc::clone(&self.dirty);
            let id = self.repo.change_feed().subscribe(self.identity, move || {
                dirty.store(true, Ordering::SeqCst);
            });
            self.subscription = Some(id);
        }
        self.refresh()
    }

    /// Drops the change-feed subscription. The snapshot stays readable and
    /// a later `attach` resubscribes cleanly.
    pub fn detach(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.repo.change_feed().unsubscribe(id);
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Current snapshot, newest-created first.
    pub fn tasks(&self) -> &[Task] {
        &self.snapshot
    }

    pub fn counts(&self) -> TaskCounts {
        let completed = self
            .snapshot
            .iter()
            .filter(|task| task.completed)
            .count();
        TaskCounts {
            total: self.snapshot.len(),
            active: self.snapshot.len() - completed,
            completed,
        }
    }

    /// Snapshot entries matching `filter`, in snapshot order.
    pub fn filtered(&self, filter: TaskFilter) -> Vec<Task> {
        self.snapshot
            .iter()
            .filter(|task| match filter {
                TaskFilter::All => true,
                TaskFilter::Active => !task.completed,
                TaskFilter::Completed => task.completed,
            })
            .cloned()
            .collect()
    }

    /// Re-lists when a change notification arrived since the last look.
    /// Returns whether a refresh happened.
    pub fn reconcile(&mut self) -> RepoResult<bool> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        self.refresh()?;
        Ok(true)
    }

    /// Unconditionally replaces the snapshot with a fresh listing.
    pub fn refresh(&mut self) -> RepoResult<()> {
        self.snapshot = self.repo.list(self.identity)?;
        Ok(())
    }

    pub fn add(&mut self, title: &str) -> RepoResult<TaskId> {
        let task = self.repo.create(self.identity, title)?;
        self.refresh()?;
        Ok(task.id)
    }

    pub fn set_completed(&mut self, id: TaskId, completed: bool) -> RepoResult<()> {
        self.repo.set_completed(self.identity, id, completed)?;
        self.refresh()
    }

    pub fn rename(&mut self, id: TaskId, new_title: &str) -> RepoResult<()> {
        self.repo.rename(self.identity, id, new_title)?;
        self.refresh()
    }

    pub fn remove(&mut self, id: TaskId) -> RepoResult<()> {
        self.repo.delete(self.identity, id)?;
        self.refresh()
    }

    pub fn clear_completed(&mut self) -> RepoResult<()> {
        self.repo.delete_all_completed(self.identity)?;
        self.refresh()
    }
}

impl<R: TaskRepository> Drop for TaskSyncEngine<R> {
    fn drop(&mut self) {
        self.detach();
    }
}
