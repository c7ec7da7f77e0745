//! Credential repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist one credential row per identity.
//! - Resolve display names to identities for name-first verification.
//!
//! # Invariants
//! - `create` rejects a second credential for the same identity.
//! - Display names are unique across all credentials, checked at write
//!   time with a UNIQUE constraint as backstop.
//! - A failed digest lookup does not reveal whether the identity exists.

use crate::model::credential::Credential;
use crate::model::identity::Identity;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Repository interface for credential storage.
pub trait CredentialRepository {
    /// True iff a credential row is stored for `identity`.
    fn exists(&self, identity: Identity) -> RepoResult<bool>;

    /// Resolves a display name to the identity owning it.
    ///
    /// Zero matches fail with `DisplayNameNotFound`. Multiple matches can
    /// only exist in data written before the uniqueness rule; resolving to
    /// either row would hand one user another user's list, so the lookup
    /// fails the same way instead of picking a winner.
    fn lookup_by_display_name(&self, name: &str) -> RepoResult<Identity>;

    /// Stores a new credential. Fails with `CredentialConflict` when the
    /// identity already has one and `DisplayNameTaken` when the name is
    /// claimed.
    fn create(&self, credential: &Credential) -> RepoResult<()>;

    /// Returns the auto-lock duration for a matching identity + digest
    /// pair, or `None` when no row matches both. A missing identity and a
    /// digest mismatch are indistinguishable here on purpose.
    fn fetch_auto_lock_minutes(
        &self,
        identity: Identity,
        secret_digest: &str,
    ) -> RepoResult<Option<u32>>;
}

/// SQLite-backed credential repository.
pub struct SqliteCredentialRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCredentialRepository<'conn> {
    /// Constructs a repository from a migrated, ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "credentials")?;
        Ok(Self { conn })
    }
}

impl CredentialRepository for SqliteCredentialRepository<'_> {
    fn exists(&self, identity: Identity) -> RepoResult<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM credentials WHERE identity = ?1);",
            [identity.to_string()],
            |row| row.get(0),
        )?;
        Ok(found == 1)
    }

    fn lookup_by_display_name(&self, name: &str) -> RepoResult<Identity> {
        let mut stmt = self
            .conn
            .prepare("SELECT identity FROM credentials WHERE display_name = ?1 LIMIT 2;")?;
        let mut rows = stmt.query([name])?;

        let first = match rows.next()? {
            Some(row) => parse_identity(&row.get::<_, String>(0)?)?,
            None => return Err(RepoError::DisplayNameNotFound),
        };
        if rows.next()?.is_some() {
            warn!("event=name_lookup module=credential_repo status=ambiguous");
            return Err(RepoError::DisplayNameNotFound);
        }

        Ok(first)
    }

    fn create(&self, credential: &Credential) -> RepoResult<()> {
        if self.exists(credential.identity)? {
            return Err(RepoError::CredentialConflict(credential.identity));
        }
        if let Some(name) = credential.display_name.as_deref() {
            match self.lookup_by_display_name(name) {
                Ok(_) => return Err(RepoError::DisplayNameTaken(name.to_string())),
                Err(RepoError::DisplayNameNotFound) => {}
                Err(other) => return Err(other),
            }
        }

        self.conn.execute(
            "INSERT INTO credentials (identity, secret_digest, auto_lock_minutes, display_name)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                credential.identity.to_string(),
                credential.secret_digest.as_str(),
                credential.auto_lock_minutes,
                credential.display_name.as_deref(),
            ],
        )?;

        Ok(())
    }

    fn fetch_auto_lock_minutes(
        &self,
        identity: Identity,
        secret_digest: &str,
    ) -> RepoResult<Option<u32>> {
        let minutes = self
            .conn
            .query_row(
                "SELECT auto_lock_minutes
                 FROM credentials
                 WHERE identity = ?1 AND secret_digest = ?2;",
                params![identity.to_string(), secret_digest],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        Ok(minutes)
    }
}

fn parse_identity(text: &str) -> RepoResult<Identity> {
    Uuid::parse_str(text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid identity value `{text}` in credentials.identity"
        ))
    })
}
