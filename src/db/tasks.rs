//! Task CRUD and the task list filter queries.

use super::labels::get_label_internal;
use super::statuses::get_status_internal;
use super::users::get_user_internal;
use super::{Database, now_ms};
use crate::error::AppError;
use crate::types::{Label, Task, TaskInput, display_name};
use anyhow::Result;
use rusqlite::{Connection, Row, params};

/// Shared SELECT head joining status and user names onto task rows.
const TASK_SELECT: &str = "SELECT DISTINCT
        t.id, t.name, t.description,
        t.status_id, s.name AS status_name,
        t.author_id, a.first_name AS author_first_name,
        a.last_name AS author_last_name, a.username AS author_username,
        t.executor_id, e.first_name AS executor_first_name,
        e.last_name AS executor_last_name, e.username AS executor_username,
        t.created_at, t.updated_at
     FROM tasks t
     INNER JOIN statuses s ON s.id = t.status_id
     INNER JOIN users a ON a.id = t.author_id
     LEFT JOIN users e ON e.id = t.executor_id";

fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let author_first: String = row.get("author_first_name")?;
    let author_last: String = row.get("author_last_name")?;
    let author_username: String = row.get("author_username")?;

    let executor_id: Option<i64> = row.get("executor_id")?;
    let executor_name = if executor_id.is_some() {
        let first: Option<String> = row.get("executor_first_name")?;
        let last: Option<String> = row.get("executor_last_name")?;
        let username: Option<String> = row.get("executor_username")?;
        Some(display_name(
            first.as_deref().unwrap_or(""),
            last.as_deref().unwrap_or(""),
            username.as_deref().unwrap_or(""),
        ))
    } else {
        None
    };

    Ok(Task {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status_id: row.get("status_id")?,
        status_name: row.get("status_name")?,
        author_id: row.get("author_id")?,
        author_name: display_name(&author_first, &author_last, &author_username),
        executor_id,
        executor_name,
        labels: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Load the labels attached to a task, oldest first.
fn load_task_labels(conn: &Connection, task_id: i64) -> Result<Vec<Label>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.name, l.created_at FROM labels l
         INNER JOIN task_labels tl ON tl.label_id = l.id
         WHERE tl.task_id = ?1
         ORDER BY l.id",
    )?;

    let labels = stmt
        .query_map(params![task_id], |row| {
            Ok(Label {
                id: row.get("id")?,
                name: row.get("name")?,
                created_at: row.get("created_at")?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(labels)
}

/// Sync task labels to the task_labels junction table.
/// Replaces all existing labels for the task.
fn sync_task_labels(conn: &Connection, task_id: i64, label_ids: &[i64]) -> Result<()> {
    conn.execute(
        "DELETE FROM task_labels WHERE task_id = ?1",
        params![task_id],
    )?;
    for label_id in label_ids {
        conn.execute(
            "INSERT OR IGNORE INTO task_labels (task_id, label_id) VALUES (?1, ?2)",
            params![task_id, label_id],
        )?;
    }
    Ok(())
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: i64) -> Result<Option<Task>> {
    let mut stmt = conn.prepare(&format!("{} WHERE t.id = ?1", TASK_SELECT))?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(mut task) => {
            task.labels = load_task_labels(conn, task_id)?;
            Ok(Some(task))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Validate the foreign keys of a task input against the store.
fn check_task_refs(conn: &Connection, input: &TaskInput) -> Result<()> {
    if get_status_internal(conn, input.status_id)?.is_none() {
        return Err(AppError::invalid_value("status", "Unknown status").into());
    }

    if let Some(executor_id) = input.executor_id {
        if get_user_internal(conn, executor_id)?.is_none() {
            return Err(AppError::invalid_value("executor", "Unknown executor").into());
        }
    }

    for &label_id in &input.label_ids {
        if get_label_internal(conn, label_id)?.is_none() {
            return Err(AppError::invalid_value("labels", "Unknown label").into());
        }
    }

    Ok(())
}

impl Database {
    /// Create a new task authored by the given user.
    pub fn create_task(&self, author_id: i64, input: &TaskInput) -> Result<Task> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::missing_field("name").into());
        }
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if get_user_internal(&tx, author_id)?.is_none() {
                return Err(AppError::user_not_found(author_id).into());
            }
            check_task_refs(&tx, input)?;

            tx.execute(
                "INSERT INTO tasks (name, description, status_id, author_id, executor_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    name,
                    input.description,
                    input.status_id,
                    author_id,
                    input.executor_id,
                    now,
                    now,
                ],
            )?;
            let task_id = tx.last_insert_rowid();

            sync_task_labels(&tx, task_id, &input.label_ids)?;

            let task = get_task_internal(&tx, task_id)?
                .ok_or_else(|| AppError::task_not_found(task_id))?;

            tx.commit()?;

            Ok(task)
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Update a task's editable fields. The author is fixed at creation
    /// and never touched here.
    pub fn update_task(&self, task_id: i64, input: &TaskInput) -> Result<Task> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::missing_field("name").into());
        }
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            get_task_internal(&tx, task_id)?
                .ok_or_else(|| AppError::task_not_found(task_id))?;
            check_task_refs(&tx, input)?;

            tx.execute(
                "UPDATE tasks SET name = ?1, description = ?2, status_id = ?3,
                 executor_id = ?4, updated_at = ?5 WHERE id = ?6",
                params![
                    name,
                    input.description,
                    input.status_id,
                    input.executor_id,
                    now,
                    task_id,
                ],
            )?;

            sync_task_labels(&tx, task_id, &input.label_ids)?;

            let task = get_task_internal(&tx, task_id)?
                .ok_or_else(|| AppError::task_not_found(task_id))?;

            tx.commit()?;

            Ok(task)
        })
    }

    /// Delete a task and its label links.
    pub fn delete_task(&self, task_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            get_task_internal(&tx, task_id)?
                .ok_or_else(|| AppError::task_not_found(task_id))?;

            tx.execute(
                "DELETE FROM task_labels WHERE task_id = ?1",
                params![task_id],
            )?;
            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;

            tx.commit()?;
            Ok(())
        })
    }

    /// List tasks matching all supplied criteria, newest first.
    ///
    /// Each criterion narrows the result set independently; absent
    /// criteria add no clause. An identifier that matches no row yields
    /// an empty result, not an error. The label criterion is a
    /// membership test over the junction table, and the SELECT is
    /// DISTINCT so the many-to-many join can never produce duplicate
    /// rows.
    pub fn list_tasks(
        &self,
        status: Option<i64>,
        executor: Option<i64>,
        label: Option<i64>,
        author: Option<i64>,
    ) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut sql = format!("{} WHERE 1=1", TASK_SELECT);
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(status_id) = status {
                sql.push_str(" AND t.status_id = ?");
                params_vec.push(Box::new(status_id));
            }

            if let Some(executor_id) = executor {
                sql.push_str(" AND t.executor_id = ?");
                params_vec.push(Box::new(executor_id));
            }

            if let Some(label_id) = label {
                sql.push_str(
                    " AND t.id IN (SELECT task_id FROM task_labels WHERE label_id = ?)",
                );
                params_vec.push(Box::new(label_id));
            }

            if let Some(author_id) = author {
                sql.push_str(" AND t.author_id = ?");
                params_vec.push(Box::new(author_id));
            }

            // Stable newest-first order even when timestamps collide
            sql.push_str(" ORDER BY t.created_at DESC, t.id DESC");

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let mut tasks: Vec<Task> = stmt
                .query_map(params_refs.as_slice(), parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();

            for task in &mut tasks {
                task.labels = load_task_labels(conn, task.id)?;
            }

            Ok(tasks)
        })
    }
}
