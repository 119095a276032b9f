//! Label CRUD operations.

use super::refs::count_label_refs;
use super::{Database, now_ms};
use crate::error::AppError;
use crate::types::Label;
use anyhow::Result;
use rusqlite::{Connection, Row, params};

fn parse_label_row(row: &Row) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

/// Internal helper to get a label using an existing connection.
pub(crate) fn get_label_internal(conn: &Connection, label_id: i64) -> Result<Option<Label>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM labels WHERE id = ?1")?;

    let result = stmt.query_row(params![label_id], parse_label_row);

    match result {
        Ok(label) => Ok(Some(label)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn name_taken(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM labels WHERE name = ?1 AND id != ?2)",
        params![name, exclude_id.unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

impl Database {
    /// Create a new label with a unique name.
    pub fn create_label(&self, name: &str) -> Result<Label> {
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
                "INSERT INTO labels (name, created_at) VALUES (?1, ?2)",
                params![name, now],
            )?;
            let id = tx.last_insert_rowid();

            tx.commit()?;

            Ok(Label {
                id,
                name: name.to_string(),
                created_at: now,
            })
        })
    }

    /// Get a label by ID.
    pub fn get_label(&self, label_id: i64) -> Result<Option<Label>> {
        self.with_conn(|conn| get_label_internal(conn, label_id))
    }

    /// List all labels, oldest first.
    pub fn list_labels(&self) -> Result<Vec<Label>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, created_at FROM labels ORDER BY id")?;
            let labels = stmt
                .query_map([], parse_label_row)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(labels)
        })
    }

    /// Rename a label, keeping the name unique.
    pub fn update_label(&self, label_id: i64, name: &str) -> Result<Label> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::missing_field("name").into());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let label = get_label_internal(&tx, label_id)?
                .ok_or_else(|| AppError::label_not_found(label_id))?;

            if name_taken(&tx, name, Some(label_id))? {
                return Err(AppError::duplicate("name", name).into());
            }

            tx.execute(
                "UPDATE labels SET name = ?1 WHERE id = ?2",
                params![name, label_id],
            )?;

            tx.commit()?;

            Ok(Label {
                name: name.to_string(),
                ..label
            })
        })
    }

    /// Delete a label. Fails with an in-use conflict while any task
    /// carries it; the check and the delete run in one transaction.
    pub fn delete_label(&self, label_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            get_label_internal(&tx, label_id)?
                .ok_or_else(|| AppError::label_not_found(label_id))?;

            if count_label_refs(&tx, label_id)? > 0 {
                return Err(AppError::in_use("label").into());
            }

            tx.execute("DELETE FROM labels WHERE id = ?1", params![label_id])?;

            tx.commit()?;
            Ok(())
        })
    }
}
