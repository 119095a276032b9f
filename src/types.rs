//! Core entity types for the task board.

use serde::{Deserialize, Serialize};

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
}

impl User {
    /// Display name: "First Last", falling back to the username when
    /// both name fields are blank.
    pub fn full_name(&self) -> String {
        display_name(&self.first_name, &self.last_name, &self.username)
    }
}

/// Compose a display name from first/last name, falling back to username.
pub fn display_name(first_name: &str, last_name: &str, username: &str) -> String {
    let full = format!("{} {}", first_name.trim(), last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

/// A workflow status assignable to tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// A label attachable to zero or more tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// A task with its relationships resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status_id: i64,
    pub status_name: String,
    pub author_id: i64,
    pub author_name: String,
    pub executor_id: Option<i64>,
    pub executor_name: Option<String>,
    pub labels: Vec<Label>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating or updating a task.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub name: String,
    pub description: String,
    pub status_id: i64,
    pub executor_id: Option<i64>,
    pub label_ids: Vec<i64>,
}

/// Input for registering or updating a user.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    /// Raw password; hashed before storage. `None` on update keeps the
    /// existing credential.
    pub password: Option<String>,
}

/// Optional criteria for narrowing the task list. Criteria combine by
/// intersection; an empty filter matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    /// Restrict to tasks with this status.
    pub status: Option<i64>,
    /// Restrict to tasks assigned to this executor.
    pub executor: Option<i64>,
    /// Restrict to tasks carrying this label (membership, not exact set).
    pub label: Option<i64>,
    /// Restrict to tasks authored by the acting user. Ignored for
    /// anonymous visitors.
    pub own_tasks: bool,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.executor.is_none() && self.label.is_none() && !self.own_tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(display_name("Ada", "Lovelace", "ada"), "Ada Lovelace");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(display_name("", "", "ada"), "ada");
        assert_eq!(display_name("  ", "", "ada"), "ada");
    }

    #[test]
    fn display_name_handles_single_part() {
        assert_eq!(display_name("Ada", "", "ada"), "Ada");
        assert_eq!(display_name("", "Lovelace", "ada"), "Lovelace");
    }

    #[test]
    fn empty_filter_reports_empty() {
        assert!(TaskFilter::default().is_empty());
        let filter = TaskFilter {
            status: Some(1),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }
}
