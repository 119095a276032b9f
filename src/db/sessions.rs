//! Cookie session persistence and flash message storage.
//!
//! Sessions are rows keyed by a random token. Anonymous visitors get a
//! session too so flash messages survive the login redirect. Flash
//! messages are stored as a JSON array on the session row and consumed
//! on the next page render.

use super::{Database, now_ms};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a flash message, mirrored by the page styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Error,
}

/// A one-shot notice shown on the next rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// A persisted session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: Option<i64>,
    pub created_at: i64,
    pub expires_at: i64,
}

fn parse_session_row(row: &Row) -> rusqlite::Result<Session> {
    Ok(Session {
        token: row.get("token")?,
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
        expires_at: row.get("expires_at")?,
    })
}

fn read_flash(conn: &Connection, token: &str) -> Result<Vec<Flash>> {
    let raw: Option<Option<String>> = conn
        .query_row(
            "SELECT flash FROM sessions WHERE token = ?1",
            params![token],
            |row| row.get(0),
        )
        .optional()?;

    Ok(raw
        .flatten()
        .map(|s| serde_json::from_str(&s).unwrap_or_default())
        .unwrap_or_default())
}

impl Database {
    /// Create a fresh session, anonymous unless a user is given.
    pub fn create_session(&self, user_id: Option<i64>, ttl_ms: i64) -> Result<Session> {
        let token = Uuid::new_v4().to_string();
        let now = now_ms();
        let expires_at = now + ttl_ms;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token, user_id, now, expires_at],
            )?;

            Ok(Session {
                token: token.clone(),
                user_id,
                created_at: now,
                expires_at,
            })
        })
    }

    /// Look up a live session. Expired rows are dropped on sight.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let now = now_ms();

        self.with_conn(|conn| {
            let session = conn
                .query_row(
                    "SELECT token, user_id, created_at, expires_at
                     FROM sessions WHERE token = ?1",
                    params![token],
                    parse_session_row,
                )
                .optional()?;

            match session {
                Some(session) if session.expires_at <= now => {
                    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
                    Ok(None)
                }
                other => Ok(other),
            }
        })
    }

    /// Bind a session to a user after successful login. The token is
    /// rotated; pending flash messages carry over to the new session.
    pub fn rotate_session(
        &self,
        old_token: Option<&str>,
        user_id: i64,
        ttl_ms: i64,
    ) -> Result<Session> {
        let token = Uuid::new_v4().to_string();
        let now = now_ms();
        let expires_at = now + ttl_ms;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let flash: Option<String> = match old_token {
                Some(old) => {
                    let pending = read_flash(&tx, old)?;
                    tx.execute("DELETE FROM sessions WHERE token = ?1", params![old])?;
                    if pending.is_empty() {
                        None
                    } else {
                        Some(serde_json::to_string(&pending)?)
                    }
                }
                None => None,
            };

            tx.execute(
                "INSERT INTO sessions (token, user_id, flash, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![token, user_id, flash, now, expires_at],
            )?;

            tx.commit()?;

            Ok(Session {
                token: token.clone(),
                user_id: Some(user_id),
                created_at: now,
                expires_at,
            })
        })
    }

    /// Delete a session (logout).
    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Ok(())
        })
    }

    /// Append a flash message to a session.
    pub fn push_flash(&self, token: &str, level: FlashLevel, message: &str) -> Result<()> {
        self.with_conn(|conn| {
            let mut pending = read_flash(conn, token)?;
            pending.push(Flash {
                level,
                message: message.to_string(),
            });

            conn.execute(
                "UPDATE sessions SET flash = ?1 WHERE token = ?2",
                params![serde_json::to_string(&pending)?, token],
            )?;
            Ok(())
        })
    }

    /// Take and clear the pending flash messages for a session.
    pub fn take_flash(&self, token: &str) -> Result<Vec<Flash>> {
        self.with_conn(|conn| {
            let pending = read_flash(conn, token)?;
            if !pending.is_empty() {
                conn.execute(
                    "UPDATE sessions SET flash = NULL WHERE token = ?1",
                    params![token],
                )?;
            }
            Ok(pending)
        })
    }

    /// Drop all expired sessions. Returns the number removed.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let now = now_ms();
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![now],
            )?;
            Ok(removed)
        })
    }
}
