//! Durable local identity persistence.
//!
//! # Responsibility
//! - Resolve the device-local identity token, minting one on first use.
//! - Replace the token when a named verification adopts another identity.
//!
//! # Invariants
//! - The token lives under one fixed, well-known file name.
//! - `get_or_create` never mints a second token while one is stored.

use crate::model::identity::Identity;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Well-known file name the local identity token is stored under.
pub const IDENTITY_FILE_NAME: &str = "identity";

#[derive(Debug)]
pub enum IdentityStoreError {
    Io(io::Error),
    /// The stored token is not a valid identity value.
    InvalidToken(String),
}

impl Display for IdentityStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "identity storage failure: {err}"),
            Self::InvalidToken(value) => write!(f, "invalid stored identity token `{value}`"),
        }
    }
}

impl Error for IdentityStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::InvalidToken(_) => None,
        }
    }
}

impl From<io::Error> for IdentityStoreError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Contract for durable local identity resolution.
pub trait IdentityStore {
    /// Returns the stored identity without creating one.
    fn get(&self) -> Result<Option<Identity>, IdentityStoreError>;

    /// Returns the stored identity, minting and persisting a fresh token
    /// when none exists yet. Idempotent across calls and restarts.
    fn get_or_create(&self) -> Result<Identity, IdentityStoreError>;

    /// Overwrites the stored identity with `identity`.
    fn persist(&self, identity: Identity) -> Result<(), IdentityStoreError>;
}

/// File-backed identity store keeping one token file under a data
/// directory.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(IDENTITY_FILE_NAME),
        }
    }

    /// Path of the backing token file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn get(&self) -> Result<Option<Identity>, IdentityStoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let trimmed = raw.trim();
        let identity = Uuid::parse_str(trimmed)
            .map_err(|_| IdentityStoreError::InvalidToken(trimmed.to_string()))?;
        Ok(Some(identity))
    }

    fn get_or_create(&self) -> Result<Identity, IdentityStoreError> {
        if let Some(identity) = self.get()? {
            return Ok(identity);
        }
        let identity = Uuid::new_v4();
        self.persist(identity)?;
        info!("event=identity_minted module=identity status=ok identity={identity}");
        Ok(identity)
    }

    fn persist(&self, identity: Identity) -> Result<(), IdentityStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, identity.to_string())?;
        Ok(())
    }
}

/// In-memory identity store for tests and ephemeral embedding.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    slot: Mutex<Option<Identity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `identity` already stored.
    pub fn with_identity(identity: Identity) -> Self {
        Self {
            slot: Mutex::new(Some(identity)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Identity>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn get(&self) -> Result<Option<Identity>, IdentityStoreError> {
        Ok(*self.lock())
    }

    fn get_or_create(&self) -> Result<Identity, IdentityStoreError> {
        let mut slot = self.lock();
        if let Some(identity) = *slot {
            return Ok(identity);
        }
        let identity = Uuid::new_v4();
        *slot = Some(identity);
        Ok(identity)
    }

    fn persist(&self, identity: Identity) -> Result<(), IdentityStoreError> {
        *self.lock() = Some(identity);
        Ok(())
    }
}
