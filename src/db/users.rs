//! User CRUD operations.

use super::refs::count_user_refs;
use super::{Database, now_ms};
use crate::error::AppError;
use crate::types::User;
use anyhow::Result;
use rusqlite::{Connection, Row, params};

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, email, password_hash, created_at";

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        created_at: row.get("created_at")?,
    })
}

/// Internal helper to get a user using an existing connection.
pub(crate) fn get_user_internal(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))?;

    let result = stmt.query_row(params![user_id], parse_user_row);

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn username_taken(conn: &Connection, username: &str, exclude_id: Option<i64>) -> Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id != ?2)",
        params![username, exclude_id.unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(taken)
}

impl Database {
    /// Create a new user with a unique username. The password must
    /// already be hashed by the caller.
    pub fn create_user(
        &self,
        username: &str,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
        password_hash: &str,
    ) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::missing_field("username").into());
        }
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if username_taken(&tx, username, None)? {
                return Err(AppError::duplicate("username", username).into());
            }

            tx.execute(
                "INSERT INTO users (username, first_name, last_name, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![username, first_name, last_name, email, password_hash, now],
            )?;
            let id = tx.last_insert_rowid();

            tx.commit()?;

            Ok(User {
                id,
                username: username.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.map(String::from),
                password_hash: password_hash.to_string(),
                created_at: now,
            })
        })
    }

    /// Get a user by ID.
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_internal(conn, user_id))
    }

    /// Get a user by username.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users WHERE username = ?1",
                USER_COLUMNS
            ))?;

            let result = stmt.query_row(params![username], parse_user_row);

            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// List all users ordered by username.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY username",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map([], parse_user_row)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(users)
        })
    }

    /// Update a user's profile. A `None` password hash keeps the
    /// existing credential.
    pub fn update_user(
        &self,
        user_id: i64,
        username: &str,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::missing_field("username").into());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let user = get_user_internal(&tx, user_id)?
                .ok_or_else(|| AppError::user_not_found(user_id))?;

            if username_taken(&tx, username, Some(user_id))? {
                return Err(AppError::duplicate("username", username).into());
            }

            let new_hash = password_hash.unwrap_or(&user.password_hash);

            tx.execute(
                "UPDATE users SET username = ?1, first_name = ?2, last_name = ?3,
                 email = ?4, password_hash = ?5 WHERE id = ?6",
                params![username, first_name, last_name, email, new_hash, user_id],
            )?;

            tx.commit()?;

            Ok(User {
                username: username.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.map(String::from),
                password_hash: new_hash.to_string(),
                ..user
            })
        })
    }

    /// Delete a user. Fails with an in-use conflict while any task
    /// references the user as author or executor; the check and the
    /// delete run in one transaction.
    pub fn delete_user(&self, user_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            get_user_internal(&tx, user_id)?
                .ok_or_else(|| AppError::user_not_found(user_id))?;

            if count_user_refs(&tx, user_id)? > 0 {
                return Err(AppError::in_use("user").into());
            }

            tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;

            tx.commit()?;
            Ok(())
        })
    }
}
