use crate::error::ApiError;
use crate::users::password::hash_password_blocking;
use crate::users::repo_types::{NewUser, UserChanges};
use crate::users::validation::{CreateUser, UpdateUser};

/// Turns validated create input into a storable record (password hashed).
pub async fn prepare_new_user(input: CreateUser) -> Result<NewUser, ApiError> {
    let password_hash = hash_password_blocking(input.password)
        .await
        .map_err(ApiError::Internal)?;
    Ok(NewUser {
        name: input.name,
        email: input.email,
        password_hash,
        age: input.age,
        role: input.role,
    })
}

/// Turns validated update input into store changes, re-hashing a new password.
pub async fn prepare_changes(input: UpdateUser) -> Result<UserChanges, ApiError> {
    let password_hash = match input.password {
        Some(plain) => Some(
            hash_password_blocking(plain)
                .await
                .map_err(ApiError::Internal)?,
        ),
        None => None,
    };
    Ok(UserChanges {
        name: input.name,
        email: input.email,
        password_hash,
        age: input.age,
        role: input.role,
        is_active: input.is_active,
    })
}
