//! User account operations.
//!
//! Registration and the user list are public. Updating or deleting an
//! account is allowed only to that account's owner, and deletion is
//! additionally refused while any task references the user.

use crate::auth::{Identity, hash_password};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::types::{User, UserInput};

const MIN_PASSWORD_LEN: usize = 3;

fn check_password(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid_value(
            "password",
            "Password must be at least 3 characters long",
        ));
    }
    Ok(())
}

pub fn list(db: &Database) -> AppResult<Vec<User>> {
    Ok(db.list_users()?)
}

pub fn get(db: &Database, user_id: i64) -> AppResult<User> {
    db.get_user(user_id)?
        .ok_or_else(|| AppError::user_not_found(user_id))
}

/// Register a new account. Open to anonymous visitors.
pub fn register(db: &Database, input: &UserInput) -> AppResult<User> {
    let password = input
        .password
        .as_deref()
        .ok_or_else(|| AppError::missing_field("password"))?;
    check_password(password)?;

    let password_hash = hash_password(password)?;
    Ok(db.create_user(
        &input.username,
        &input.first_name,
        &input.last_name,
        input.email.as_deref(),
        &password_hash,
    )?)
}

/// Update an account. Only the account's owner may do this.
pub fn update(
    db: &Database,
    identity: &Identity,
    user_id: i64,
    input: &UserInput,
) -> AppResult<User> {
    let acting = identity.require()?;
    if acting.id != user_id {
        return Err(AppError::forbidden(
            "You do not have permission to modify another user.",
        ));
    }

    let password_hash = match input.password.as_deref() {
        Some(password) => {
            check_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    Ok(db.update_user(
        user_id,
        &input.username,
        &input.first_name,
        &input.last_name,
        input.email.as_deref(),
        password_hash.as_deref(),
    )?)
}

/// Delete an account. Only the owner may do this, and the store refuses
/// with an in-use conflict while the user authors or executes any task.
pub fn delete(db: &Database, identity: &Identity, user_id: i64) -> AppResult<()> {
    let acting = identity.require()?;
    if acting.id != user_id {
        return Err(AppError::forbidden(
            "You do not have permission to modify another user.",
        ));
    }

    Ok(db.delete_user(user_id)?)
}
