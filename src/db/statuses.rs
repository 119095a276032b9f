//! Status CRUD operations.

use super::refs::count_status_refs;
use super::{Database, now_ms};
use crate::error::AppError;
use crate::types::Status;
use anyhow::Result;
use rusqlite::{Connection, Row, params};

fn parse_status_row(row: &Row) -> rusqlite::Result<Status> {
    Ok(Status {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

/// Internal helper to get a status using an existing connection.
pub(crate) fn get_status_internal(conn: &Connection, status_id: i64) -> Result<Option<Status>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM statuses WHERE id = ?1")?;

    let result = stmt.query_row(params![status_id], parse_status_row);

    match result {
        Ok(status) => Ok(Some(status)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Check whether another status already uses the given name.
fn name_taken(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM statuses WHERE name = ?1 AND id != ?2)",
        params![name, exclude_id.unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

impl Database {
    /// Create a new status with a unique name.
    pub fn create_status(&self, name: &str) -> Result<Status> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::missing_field("name").into());
        }
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if name_taken(&tx, name, None)? {
                return Err(AppError::duplicate("name", name).into());
            }

            tx.execute(
                "INSERT INTO statuses (name, created_at) VALUES (?1, ?2)",
                params![name, now],
            )?;
            let id = tx.last_insert_rowid();

            tx.commit()?;

            Ok(Status {
                id,
                name: name.to_string(),
                created_at: now,
            })
        })
    }

    /// Get a status by ID.
    pub fn get_status(&self, status_id: i64) -> Result<Option<Status>> {
        self.with_conn(|conn| get_status_internal(conn, status_id))
    }

    /// List all statuses, oldest first.
    pub fn list_statuses(&self) -> Result<Vec<Status>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, created_at FROM statuses ORDER BY id")?;
            let statuses = stmt
                .query_map([], parse_status_row)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(statuses)
        })
    }

    /// Rename a status, keeping the name unique.
    pub fn update_status(&self, status_id: i64, name: &str) -> Result<Status> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::missing_field("name").into());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let status = get_status_internal(&tx, status_id)?
                .ok_or_else(|| AppError::status_not_found(status_id))?;

            if name_taken(&tx, name, Some(status_id))? {
                return Err(AppError::duplicate("name", name).into());
            }

            tx.execute(
                "UPDATE statuses SET name = ?1 WHERE id = ?2",
                params![name, status_id],
            )?;

            tx.commit()?;

            Ok(Status {
                name: name.to_string(),
                ..status
            })
        })
    }

    /// Delete a status. Fails with an in-use conflict while any task
    /// references it; the check and the delete run in one transaction.
    pub fn delete_status(&self, status_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            get_status_internal(&tx, status_id)?
                .ok_or_else(|| AppError::status_not_found(status_id))?;

            if count_status_refs(&tx, status_id)? > 0 {
                return Err(AppError::in_use("status").into());
            }

            tx.execute("DELETE FROM statuses WHERE id = ?1", params![status_id])?;

            tx.commit()?;
            Ok(())
        })
    }
}
