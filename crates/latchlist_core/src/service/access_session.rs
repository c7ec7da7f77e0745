//! Access session state machine.
//!
//! # Responsibility
//! - Orchestrate credential creation, verification and the unlock session.
//! - Own the auto-lock deadline and apply it on every state observation.
//!
//! # Invariants
//! - The session lives in one explicit slot, mutated only by the
//!   transitions below, and is never persisted. Every process starts
//!   locked.
//! - Arming the deadline always replaces the previous one, so a deadline
//!   from an earlier unlock can never fire into a later session.
//! - An unresolvable display name fails verification outright. It never
//!   falls back to the locally stored identity, which would let a stranger
//!   probe whatever identity happens to live on this device.
//! - Verification failures are reported as one generic error; wrong PIN
//!   and unknown user are indistinguishable to the caller.

use crate::clock::Clock;
use crate::model::credential::{
    normalize_display_name, pin_digest, validate_pin, Credential, CredentialInputError,
};
use crate::model::identity::Identity;
use crate::repo::credential_repo::CredentialRepository;
use crate::repo::identity_store::{IdentityStore, IdentityStoreError};
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Observable access state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// No credential is known for the local identity (or no identity is
    /// stored at all). The next step is credential setup.
    Uninitialized,
    /// A credential exists and no unlock session is active.
    Locked,
    /// An unlock session is active and its deadline has not passed.
    Unlocked,
}

/// Errors surfaced by session operations.
#[derive(Debug)]
pub enum AccessError {
    /// Rejected input, recoverable by re-prompting.
    Input(CredentialInputError),
    /// Wrong PIN or unresolvable display name. Deliberately generic.
    InvalidCredential,
    /// Local identity storage failure.
    Store(IdentityStoreError),
    /// Credential persistence failure, including create conflicts.
    Repo(RepoError),
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input(err) => write!(f, "{err}"),
            Self::InvalidCredential => write!(f, "invalid credentials"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Input(err) => Some(err),
            Self::InvalidCredential => None,
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<CredentialInputError> for AccessError {
    fn from(value: CredentialInputError) -> Self {
        Self::Input(value)
    }
}

impl From<IdentityStoreError> for AccessError {
    fn from(value: IdentityStoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RepoError> for AccessError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// The one active unlock session. Dropping it is the lock transition.
#[derive(Debug, Clone, Copy)]
struct ActiveSession {
    identity: Identity,
    expires_at: Instant,
}

/// Orchestrates credential setup, verification and auto-locking.
pub struct AccessSessionManager<I, C, K>
where
    I: IdentityStore,
    C: CredentialRepository,
    K: Clock,
{
    identities: I,
    credentials: C,
    clock: K,
    session: Option<ActiveSession>,
}

impl<I, C, K> AccessSessionManager<I, C, K>
where
    I: IdentityStore,
    C: CredentialRepository,
    K: Clock,
{
    pub fn new(identities: I, credentials: C, clock: K) -> Self {
        Self {
            identities,
            credentials,
            clock,
            session: None,
        }
    }

    /// Reports the current access state.
    ///
    /// Does not mint an identity: a device that has never set up a
    /// credential stays `Uninitialized` until `create_credential` runs.
    pub fn status(&mut self) -> Result<AccessState, AccessError> {
        self.expire_if_due();
        if self.session.is_some() {
            return Ok(AccessState::Unlocked);
        }

        let identity = match self.identities.get()? {
            Some(identity) => identity,
            None => return Ok(AccessState::Uninitialized),
        };
        if self.credentials.exists(identity)? {
            Ok(AccessState::Locked)
        } else {
            Ok(AccessState::Uninitialized)
        }
    }

    /// Creates the credential for the local identity and opens a session.
    ///
    /// Input is re-validated here even though entry forms pre-validate;
    /// the form is not the trust boundary.
    pub fn create_credential(
        &mut self,
        raw_pin: &str,
        auto_lock_minutes: u32,
        display_name: Option<&str>,
    ) -> Result<(), AccessError> {
        validate_pin(raw_pin)?;
        if auto_lock_minutes == 0 {
            return Err(CredentialInputError::ZeroAutoLock.into());
        }
        let display_name = match display_name {
            Some(raw) => Some(
                normalize_display_name(raw).ok_or(CredentialInputError::EmptyDisplayName)?,
            ),
            None => None,
        };

        let identity = self.identities.get_or_create()?;
        let credential = Credential {
            identity,
            secret_digest: pin_digest(raw_pin),
            auto_lock_minutes,
            display_name,
        };
        self.credentials.create(&credential)?;

        self.unlock(identity, auto_lock_minutes);
        info!(
            "event=credential_create module=session status=ok auto_lock_minutes={auto_lock_minutes} named={}",
            credential.display_name.is_some()
        );
        Ok(())
    }

    /// Verifies a PIN and opens a session on success.
    ///
    /// With a non-empty display name the target identity is resolved
    /// through the name directory only. Without one, the locally stored
    /// identity is used. A successful named verification adopts the
    /// resolved identity as this device's local identity, so later
    /// sessions default to it.
    pub fn verify_credential(
        &mut self,
        raw_pin: &str,
        display_name: Option<&str>,
    ) -> Result<(), AccessError> {
        let named = display_name.map(str::trim).filter(|name| !name.is_empty());
        let identity = match named {
            Some(name) => match self.credentials.lookup_by_display_name(name) {
                Ok(identity) => identity,
                Err(RepoError::DisplayNameNotFound) => {
                    warn!("event=credential_verify module=session status=invalid reason=name_unresolved");
                    return Err(AccessError::InvalidCredential);
                }
                Err(other) => return Err(other.into()),
            },
            None => self
                .identities
                .get()?
                .ok_or(AccessError::InvalidCredential)?,
        };

        let digest = pin_digest(raw_pin);
        let minutes = match self.credentials.fetch_auto_lock_minutes(identity, &digest)? {
            Some(minutes) => minutes,
            None => {
                warn!("event=credential_verify module=session status=invalid reason=no_match");
                return Err(AccessError::InvalidCredential);
            }
        };

        self.identities.persist(identity)?;
        self.unlock(identity, minutes);
        info!(
            "event=credential_verify module=session status=ok named={} auto_lock_minutes={minutes}",
            named.is_some()
        );
        Ok(())
    }

    /// Locks immediately and clears any pending deadline.
    pub fn lock(&mut self) {
        if self.session.take().is_some() {
            info!("event=session_lock module=session status=ok reason=explicit");
        }
    }

    /// Identity owning the active session, if one is open.
    ///
    /// This is the value the task layer scopes reads and writes by.
    pub fn unlocked_identity(&mut self) -> Option<Identity> {
        self.expire_if_due();
        self.session.as_ref().map(|session| session.identity)
    }

    // Opens the session slot, replacing whatever deadline was armed before.
    fn unlock(&mut self, identity: Identity, auto_lock_minutes: u32) {
        let lifetime = Duration::from_secs(u64::from(auto_lock_minutes) * 60);
        self.session = Some(ActiveSession {
            identity,
            expires_at: self.clock.now() + lifetime,
        });
    }

    // Lazy expiry: the deadline is checked at every observation instead of
    // on a background thread. Activity does not renew it.
    fn expire_if_due(&mut self) {
        if let Some(session) = &self.session {
            if self.clock.now() >= session.expires_at {
                self.session = None;
                info!("event=session_lock module=session status=ok reason=auto_lock");
            }
        }
    }
}
