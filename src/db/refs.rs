//! Reference counting for delete-time usage checks.
//!
//! Statuses, labels, and users may not be deleted while any task still
//! references them. The delete operations re-run these counts inside
//! their own transactions; the trait exposes the same queries to
//! handlers that want to probe usage without deleting.

use super::Database;
use anyhow::Result;
use rusqlite::{Connection, params};

/// Usage queries over the task collection, one per guarded entity kind.
pub trait ReferenceChecker {
    /// Number of tasks carrying the given status.
    fn status_references(&self, status_id: i64) -> Result<i64>;

    /// Number of tasks carrying the given label.
    fn label_references(&self, label_id: i64) -> Result<i64>;

    /// Number of tasks referencing the given user as author or executor.
    fn user_references(&self, user_id: i64) -> Result<i64>;
}

impl ReferenceChecker for Database {
    fn status_references(&self, status_id: i64) -> Result<i64> {
        self.with_conn(|conn| count_status_refs(conn, status_id))
    }

    fn label_references(&self, label_id: i64) -> Result<i64> {
        self.with_conn(|conn| count_label_refs(conn, label_id))
    }

    fn user_references(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| count_user_refs(conn, user_id))
    }
}

pub(crate) fn count_status_refs(conn: &Connection, status_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE status_id = ?1",
        params![status_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub(crate) fn count_label_refs(conn: &Connection, label_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM task_labels WHERE label_id = ?1",
        params![label_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub(crate) fn count_user_refs(conn: &Connection, user_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE author_id = ?1 OR executor_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
