//! Label management operations. All of them require a logged-in user.

use crate::auth::Identity;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::types::Label;

pub fn list(db: &Database, identity: &Identity) -> AppResult<Vec<Label>> {
    identity.require()?;
    Ok(db.list_labels()?)
}

pub fn get(db: &Database, identity: &Identity, label_id: i64) -> AppResult<Label> {
    identity.require()?;
    db.get_label(label_id)?
        .ok_or_else(|| AppError::label_not_found(label_id))
}

pub fn create(db: &Database, identity: &Identity, name: &str) -> AppResult<Label> {
    identity.require()?;
    Ok(db.create_label(name)?)
}

pub fn update(db: &Database, identity: &Identity, label_id: i64, name: &str) -> AppResult<Label> {
    identity.require()?;
    Ok(db.update_label(label_id, name)?)
}

/// Delete a label. Refused with an in-use conflict while any task
/// still carries it.
pub fn delete(db: &Database, identity: &Identity, label_id: i64) -> AppResult<()> {
    identity.require()?;
    Ok(db.delete_label(label_id)?)
}
