//! User account models and auth request/response bodies.
//!
//! Session and link tokens are stored as SHA-256 hashes. The raw value only
//! ever appears in the response (sessions) or the outbound mail (links).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a user record from the database.
///
/// `password_hash` is `None` for accounts created through a magic link that
/// never set a password.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a one-time token in `auth_tokens` may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    PasswordReset,
    MagicLink,
}

impl TokenPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::PasswordReset => "password_reset",
            TokenPurpose::MagicLink => "magic_link",
        }
    }
}

/// Request body for `POST /api/v1/auth/signup`.
///
/// ```json
/// {
///   "email": "dm@example.com",
///   "password": "a long passphrase",
///   "display_name": "The DM"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for the password-reset and magic-link request endpoints.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPasswordResetRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ConsumeMagicLinkRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
}

/// `current_password` may be left out by accounts that never had one.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    pub new_password: String,
}

/// Body for `DELETE /api/v1/account`.
///
/// Accounts with a password must confirm it.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteAccountRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// Public view of a user. Never includes the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            has_password: user.password_hash.is_some(),
            created_at: user.created_at,
        }
    }
}

/// Returned by signup, login and magic-link consumption.
///
/// The `session_token` is shown only here; send it back as
/// `Authorization: Bearer <session_token>`.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Rows removed by the account deletion cascade.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct DeletionSummary {
    pub dice_rolls: u64,
    pub map_pins: u64,
    pub npcs: u64,
    pub session_logs: u64,
    pub characters: u64,
    pub campaigns: u64,
    pub auth_tokens: u64,
    pub sessions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(password_hash: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "dm@example.com".into(),
            display_name: "DM".into(),
            password_hash: password_hash.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn response_never_serializes_the_hash() {
        let json = serde_json::to_value(UserResponse::from(user(Some("$argon2id$secret")))).unwrap();
        assert_eq!(json["has_password"], true);
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn magic_link_users_have_no_password() {
        assert!(!UserResponse::from(user(None)).has_password);
    }

    #[test]
    fn change_password_current_is_optional() {
        let req: ChangePasswordRequest =
            serde_json::from_str(r#"{"new_password": "a long passphrase"}"#).unwrap();
        assert!(req.current_password.is_none());
    }

    #[test]
    fn delete_request_password_is_optional() {
        let req: DeleteAccountRequest = serde_json::from_str("{}").unwrap();
        assert!(req.password.is_none());
    }
}
