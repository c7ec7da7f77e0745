//! Core domain logic for LatchList: PIN-gated access sessions and
//! identity-scoped task synchronization.
//! This crate is the single source of truth for business invariants.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::credential::{
    normalize_display_name, pin_digest, validate_pin, Credential, CredentialInputError,
    MIN_PIN_DIGITS,
};
pub use model::identity::Identity;
pub use model::task::{Task, TaskId};
pub use repo::credential_repo::{CredentialRepository, SqliteCredentialRepository};
pub use repo::identity_store::{
    FileIdentityStore, IdentityStore, IdentityStoreError, InMemoryIdentityStore,
    IDENTITY_FILE_NAME,
};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use service::access_session::{AccessError, AccessSessionManager, AccessState};
pub use sync::change_feed::{ChangeFeed, SubscriptionId};
pub use sync::task_sync::{TaskCounts, TaskFilter, TaskSyncEngine};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
