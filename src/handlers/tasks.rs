//! Task operations: filtered listing, detail, create, update, delete.
//!
//! The task list is public. Everything else requires a logged-in user.
//! Any authenticated user may update any task; deletion is restricted
//! to the task's author.

use crate::auth::Identity;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::types::{Task, TaskFilter, TaskInput};

/// List tasks matching the filter criteria, newest first.
///
/// Criteria combine by intersection. The "own tasks" criterion resolves
/// against the acting identity and is a no-op for anonymous visitors.
pub fn list(db: &Database, identity: &Identity, filter: &TaskFilter) -> AppResult<Vec<Task>> {
    let author = if filter.own_tasks {
        identity.user_id()
    } else {
        None
    };

    Ok(db.list_tasks(filter.status, filter.executor, filter.label, author)?)
}

pub fn detail(db: &Database, identity: &Identity, task_id: i64) -> AppResult<Task> {
    identity.require()?;
    db.get_task(task_id)?
        .ok_or_else(|| AppError::task_not_found(task_id))
}

/// Create a task authored by the acting user.
pub fn create(db: &Database, identity: &Identity, input: &TaskInput) -> AppResult<Task> {
    let acting = identity.require()?;
    Ok(db.create_task(acting.id, input)?)
}

/// Update a task. Open to any authenticated user; the author field is
/// never editable.
pub fn update(
    db: &Database,
    identity: &Identity,
    task_id: i64,
    input: &TaskInput,
) -> AppResult<Task> {
    identity.require()?;
    Ok(db.update_task(task_id, input)?)
}

/// Delete a task. Only its author may do this.
pub fn delete(db: &Database, identity: &Identity, task_id: i64) -> AppResult<()> {
    let acting = identity.require()?;

    let task = db
        .get_task(task_id)?
        .ok_or_else(|| AppError::task_not_found(task_id))?;

    if task.author_id != acting.id {
        return Err(AppError::forbidden("Only the task's author can delete it"));
    }

    Ok(db.delete_task(task_id)?)
}
