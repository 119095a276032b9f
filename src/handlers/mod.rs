//! Per-entity operation handlers.
//!
//! Each handler takes the acting identity, the operation input, and the
//! store, and returns a typed result: success with data, or a
//! structured [`crate::error::AppError`] (validation, permission,
//! conflict, not-found). Access control decisions live here, not in the
//! db layer or the web layer.

pub mod labels;
pub mod statuses;
pub mod tasks;
pub mod users;
