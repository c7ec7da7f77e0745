//! Task domain model.

use crate::model::identity::Identity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one task row.
pub type TaskId = Uuid;

/// One task owned by a single identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub completed: bool,
    /// Creation time in unix epoch milliseconds. Listings show newest first.
    pub created_at: i64,
    pub identity: Identity,
}

/// Returns the trimmed title, or `None` when nothing remains.
///
/// Whitespace-only input is rejected at every write path, so stored titles
/// are always non-empty and trimmed.
pub fn normalize_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
