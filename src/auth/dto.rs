use serde::{Deserialize, Serialize};

use crate::accounts::PublicAccount;

/// Request body for signup. Every field is optional at the wire level so that
/// a missing field is reported as such instead of as a JSON rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: PublicAccount,
}

impl AccountResponse {
    pub fn new(user: PublicAccount) -> Self {
        Self { success: true, message: None, user }
    }

    pub fn with_message(message: &'static str, user: PublicAccount) -> Self {
        Self { success: true, message: Some(message), user }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    pub user: PublicAccount,
}
