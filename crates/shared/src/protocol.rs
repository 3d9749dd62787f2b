//! Request and response payloads exchanged with the hotel REST service.

use serde::{Deserialize, Serialize};

use crate::domain::{Role, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

/// Authenticated-session payload returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl AuthSession {
    pub fn current_user(&self) -> CurrentUser {
        CurrentUser {
            user_id: self.user_id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// The signed-in user as persisted between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_privileged(&self) -> bool {
        self.role == Role::Admin
    }
}
