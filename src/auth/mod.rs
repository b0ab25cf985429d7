use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::profiles::ProfileResponse;

pub mod handler;
pub mod jwt;
pub mod utils;

#[derive(Debug, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterAccount {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3 and 50 characters"
    ))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirm: String,
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,
}

/// Login accepts either identifier; the username wins when both are sent.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginAccount {
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub password: String,
}

impl LoginAccount {
    /// Account column to match and the value to match it against.
    pub fn identifier(&self) -> Option<(&'static str, &str)> {
        match (&self.username, &self.email) {
            (Some(username), _) => Some(("username", username.as_str())),
            (None, Some(email)) => Some(("email", email.as_str())),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub profile: ProfileResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_rules() {
        let ok = RegisterAccount {
            username: "newuser".to_string(),
            email: "newuser@example.com".to_string(),
            password: "newpass123".to_string(),
            password_confirm: "newpass123".to_string(),
            bio: Some("New user bio".to_string()),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterAccount {
            username: "ab".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            password_confirm: "short".to_string(),
            bio: None,
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn password_confirmation_must_match() {
        let mismatch = RegisterAccount {
            username: "newuser".to_string(),
            email: "newuser@example.com".to_string(),
            password: "newpass123".to_string(),
            password_confirm: "different123".to_string(),
            bio: None,
        };
        let errors = mismatch.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password_confirm"));
    }

    #[test]
    fn login_by_username_or_email() {
        let login: LoginAccount =
            serde_json::from_str(r#"{"username":"testuser1","password":"testpass123"}"#).unwrap();
        assert_eq!(login.identifier(), Some(("username", "testuser1")));

        let login: LoginAccount =
            serde_json::from_str(r#"{"email":"test1@example.com","password":"testpass123"}"#)
                .unwrap();
        assert_eq!(login.identifier(), Some(("email", "test1@example.com")));
        assert!(login.validate().is_ok());

        let login: LoginAccount = serde_json::from_str(r#"{"password":"testpass123"}"#).unwrap();
        assert_eq!(login.identifier(), None);
    }
}
