//! Console Users
//!
//! Operator accounts of the admin console. Updates re-fetch the list, since
//! the master may flip flags such as `PasswordNeedsChange` on save.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::resource::{Entity, EntityId, Resource, ResourceModule};

/// User record as served by `/users`
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(rename = "ID")]
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub salt: i64,
    #[serde(default)]
    pub password_needs_change: bool,
    /// Set by the console when `password` holds a new plaintext password
    #[serde(default)]
    pub password_changed: bool,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("password_needs_change", &self.password_needs_change)
            .field("password_changed", &self.password_changed)
            .finish()
    }
}

impl Entity for User {
    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Payload for creating a user
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewUser {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub password_needs_change: bool,
}

pub struct Users;

impl Resource for Users {
    type Entity = User;
    type Draft = NewUser;

    const NAME: &'static str = "users";
    const PATH: &'static str = "/users";
    const REFETCH_AFTER_UPDATE: bool = true;

    fn create_query(draft: &NewUser) -> Vec<(&'static str, String)> {
        vec![
            ("name", draft.name.clone()),
            ("password", draft.password.clone()),
            ("pwNeedsChange", draft.password_needs_change.to_string()),
        ]
    }

    /// A changed password travels base64-encoded
    fn prepare_update(user: &User) -> User {
        let mut user = user.clone();
        if user.password_changed {
            user.password = STANDARD.encode(user.password.as_bytes());
        }
        user
    }
}

pub type UsersModule = ResourceModule<Users>;
