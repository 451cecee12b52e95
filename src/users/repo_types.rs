use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Access role of a user.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// User document as stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,           // store-assigned id
    pub name: String,
    pub email: String,          // lowercased
    pub password: String,       // Argon2 PHC string, never exposed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn default_active() -> bool {
    true
}

/// Validated fields for a record that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<i32>,
    pub role: Role,
}

impl NewUser {
    /// Builds the stored document; id and timestamps are assigned here.
    pub fn into_document(self) -> UserDocument {
        let now = DateTime::now();
        UserDocument {
            id: ObjectId::new(),
            name: self.name,
            email: self.email,
            password: self.password_hash,
            age: self.age,
            role: self.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Allow-listed fields a partial update may overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub age: Option<i32>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Default::default()
        }
    }
}

/// Conjunction of the list filters; `search` matches name OR email.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub is_active: Option<bool>,
    pub role: Option<String>,
    pub search: Option<String>,
}

/// Slice of the sorted result set to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u64,
    pub limit: u64,
}
