//! Status management operations. All of them require a logged-in user.

use crate::auth::Identity;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::types::Status;

pub fn list(db: &Database, identity: &Identity) -> AppResult<Vec<Status>> {
    identity.require()?;
    Ok(db.list_statuses()?)
}

pub fn get(db: &Database, identity: &Identity, status_id: i64) -> AppResult<Status> {
    identity.require()?;
    db.get_status(status_id)?
        .ok_or_else(|| AppError::status_not_found(status_id))
}

pub fn create(db: &Database, identity: &Identity, name: &str) -> AppResult<Status> {
    identity.require()?;
    Ok(db.create_status(name)?)
}

pub fn update(
    db: &Database,
    identity: &Identity,
    status_id: i64,
    name: &str,
) -> AppResult<Status> {
    identity.require()?;
    Ok(db.update_status(status_id, name)?)
}

/// Delete a status. Refused with an in-use conflict while any task
/// still references it.
pub fn delete(db: &Database, identity: &Identity, status_id: i64) -> AppResult<()> {
    identity.require()?;
    Ok(db.delete_status(status_id)?)
}
