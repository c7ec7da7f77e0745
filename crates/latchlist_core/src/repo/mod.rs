//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from session/sync orchestration.
//!
//! # Invariants
//! - Repositories refuse to operate on connections that have not been
//!   migrated to the schema version this binary expects.
//! - Repository APIs return semantic errors (conflict, not-found) in
//!   addition to DB transport errors.

pub mod credential_repo;
pub mod identity_store;
pub mod task_repo;

use crate::db::{migrations, DbError};
use crate::model::identity::Identity;
use crate::model::task::TaskId;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Shared error type for credential and task persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// A credential already exists for this identity.
    CredentialConflict(Identity),
    /// The display name is already claimed by another credential.
    DisplayNameTaken(String),
    /// Display-name lookup resolved to zero usable identities.
    DisplayNameNotFound,
    /// Task title is empty after trimming.
    InvalidTitle,
    TaskNotFound(TaskId),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::CredentialConflict(identity) => {
                write!(f, "a credential already exists for identity {identity}")
            }
            Self::DisplayNameTaken(name) => write!(f, "display name `{name}` is already taken"),
            Self::DisplayNameNotFound => write!(f, "display name does not resolve to an identity"),
            Self::InvalidTitle => write!(f, "task title must not be empty"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Verifies the connection has been migrated and carries the given table.
///
/// Repositories call this at construction so that later queries can assume
/// a ready schema.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    required_table: &'static str,
) -> RepoResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = migrations::latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [required_table],
        |row| row.get(0),
    )?;
    if table_exists == 0 {
        return Err(RepoError::MissingRequiredTable(required_table));
    }

    Ok(())
}
