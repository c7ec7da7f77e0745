//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide identity-scoped CRUD over the `tasks` table.
//! - Publish a change notification after every successful mutation.
//!
//! # Invariants
//! - Every mutation filters by identity in SQL, never only in memory.
//! - Listing returns newest-created rows first.
//! - `set_completed` is a safe no-op when the row is out of scope.

use crate::model::identity::Identity;
use crate::model::task::{normalize_title, Task, TaskId};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use crate::sync::change_feed::ChangeFeed;
use rusqlite::{params, Connection, Row};
use std::sync::Arc;
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    identity,
    title,
    status,
    created_at
FROM tasks";

/// Repository interface for identity-scoped task storage.
pub trait TaskRepository {
    /// All tasks owned by `identity`, newest-created first.
    fn list(&self, identity: Identity) -> RepoResult<Vec<Task>>;

    /// Stores a new active task with the trimmed title.
    fn create(&self, identity: Identity, title: &str) -> RepoResult<Task>;

    /// Flips completion state. Rows outside `identity`'s scope are left
    /// untouched without an error; a missing row and a foreign row look
    /// the same from here.
    fn set_completed(&self, identity: Identity, id: TaskId, completed: bool) -> RepoResult<()>;

    /// Replaces the title of one owned task.
    fn rename(&self, identity: Identity, id: TaskId, new_title: &str) -> RepoResult<()>;

    /// Removes one owned task.
    fn delete(&self, identity: Identity, id: TaskId) -> RepoResult<()>;

    /// Removes every completed task owned by `identity`.
    fn delete_all_completed(&self, identity: Identity) -> RepoResult<()>;

    /// Shared notification registry for this storage.
    fn change_feed(&self) -> Arc<ChangeFeed>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
    feed: Arc<ChangeFeed>,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Constructs a repository from a migrated, ready connection.
    ///
    /// The feed is passed in so every repository handle over the same
    /// storage shares one subscriber registry.
    pub fn try_new(conn: &'conn Connection, feed: Arc<ChangeFeed>) -> RepoResult<Self> {
        ensure_connection_ready(conn, "tasks")?;
        Ok(Self { conn, feed })
    }

    fn get(&self, identity: Identity, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE uuid = ?1 AND identity = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), identity.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn list(&self, identity: Identity) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE identity = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([identity.to_string()])?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn create(&self, identity: Identity, title: &str) -> RepoResult<Task> {
        let title = normalize_title(title).ok_or(RepoError::InvalidTitle)?;
        let id: TaskId = Uuid::new_v4();

        self.conn.execute(
            "INSERT INTO tasks (uuid, identity, title, status)
             VALUES (?1, ?2, ?3, 'active');",
            params![id.to_string(), identity.to_string(), title.as_str()],
        )?;

        let task = self.get(identity, id)?.ok_or_else(|| {
            RepoError::InvalidData("created task row is not readable".to_string())
        })?;
        self.feed.notify(identity);
        Ok(task)
    }

    fn set_completed(&self, identity: Identity, id: TaskId, completed: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET status = ?1
             WHERE uuid = ?2 AND identity = ?3;",
            params![
                status_to_db(completed),
                id.to_string(),
                identity.to_string()
            ],
        )?;

        if changed > 0 {
            self.feed.notify(identity);
        }
        Ok(())
    }

    fn rename(&self, identity: Identity, id: TaskId, new_title: &str) -> RepoResult<()> {
        let title = normalize_title(new_title).ok_or(RepoError::InvalidTitle)?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?1
             WHERE uuid = ?2 AND identity = ?3;",
            params![title.as_str(), id.to_string(), identity.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(id));
        }

        self.feed.notify(identity);
        Ok(())
    }

    fn delete(&self, identity: Identity, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE uuid = ?1 AND identity = ?2;",
            params![id.to_string(), identity.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(id));
        }

        self.feed.notify(identity);
        Ok(())
    }

    fn delete_all_completed(&self, identity: Identity) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE identity = ?1 AND status = 'completed';",
            [identity.to_string()],
        )?;

        if changed > 0 {
            self.feed.notify(identity);
        }
        Ok(())
    }

    fn change_feed(&self) -> Arc<ChangeFeed> {
        Arc::clone(&self.feed)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in tasks.uuid"))
    })?;

    let identity_text: String = row.get("identity")?;
    let identity = Uuid::parse_str(&identity_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid identity value `{identity_text}` in tasks.identity"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let completed = parse_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status value `{status_text}` in tasks.status"))
    })?;

    Ok(Task {
        id,
        identity,
        title: row.get("title")?,
        completed,
        created_at: row.get("created_at")?,
    })
}

fn status_to_db(completed: bool) -> &'static str {
    if completed {
        "completed"
    } else {
        "active"
    }
}

fn parse_status(value: &str) -> Option<bool> {
    match value {
        "active" => Some(false),
        "completed" => Some(true),
        _ => None,
    }
}
