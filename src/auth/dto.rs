use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CurrentUser;

/// Request body for register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeEmailRequest {
    pub email: String,
    pub confirm_email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub password: String,
    pub confirm_password: String,
}

/// Response returned after register, login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
}

impl From<&CurrentUser> for PublicUser {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.uid,
            email: user.email.clone(),
            display_name: user.display_name(),
        }
    }
}
