// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::{
    config::TokenSettings,
    error::ApiError,
    store::UserStore,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    /// Unique, trimmed, lowercase.
    pub username: String,

    /// Unique, trimmed, lowercase.
    pub email: String,

    pub full_name: String,

    /// URL of the stored avatar. Always present.
    pub avatar: String,

    /// URL of the stored cover image, or empty.
    pub cover_image: String,

    /// Video ids, oldest first. Weak references.
    pub watch_history: Vec<i64>,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip_serializing)]
    pub password: String,

    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user as it may leave the service: no password hash, no refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            watch_history: user.watch_history,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields for a new record. `password` holds the raw value until
/// `User::create` replaces it with its hash.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub password: String,
}

/// Partial update. `None` leaves a field untouched; `refresh_token:
/// Some(None)` clears the stored token.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<Option<String>>,
}

impl User {
    /// Persists a new user. The raw password is hashed and identifiers are
    /// normalized before the record reaches the store.
    pub async fn create(store: &dyn UserStore, mut new_user: NewUser) -> Result<User, ApiError> {
        new_user.username = new_user.username.trim().to_lowercase();
        new_user.email = new_user.email.trim().to_lowercase();
        new_user.full_name = new_user.full_name.trim().to_string();
        new_user.password = hash_password(&new_user.password)?;
        store.insert(new_user).await
    }

    /// Applies `changes`. The password is re-hashed only when it is part of
    /// the change set.
    pub async fn update(
        store: &dyn UserStore,
        id: i64,
        mut changes: UserChanges,
    ) -> Result<Option<User>, ApiError> {
        if let Some(raw) = changes.password.take() {
            changes.password = Some(hash_password(&raw)?);
        }
        if let Some(email) = changes.email.take() {
            changes.email = Some(email.trim().to_lowercase());
        }
        store.update(id, changes).await
    }

    pub fn is_password_correct(&self, candidate: &str) -> Result<bool, ApiError> {
        verify_password(candidate, &self.password)
    }

    pub fn generate_access_token(&self, settings: &TokenSettings) -> Result<String, ApiError> {
        sign_jwt(self.id, &self.email, &self.username, &self.full_name, settings)
    }

    pub fn generate_refresh_token(&self, settings: &TokenSettings) -> Result<String, ApiError> {
        sign_jwt(self.id, &self.email, &self.username, &self.full_name, settings)
    }
}

/// Text fields of the registration form.
///
/// Every field must contain something other than whitespace.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    #[validate(custom(function = not_blank, message = "username is required"))]
    pub username: String,
    #[validate(custom(function = not_blank, message = "email is required"))]
    pub email: String,
    #[validate(custom(function = not_blank, message = "password is required"))]
    pub password: String,
    #[validate(custom(function = not_blank, message = "fullName is required"))]
    pub full_name: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// DTO for user login. Either identifier may be used.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Payload returned after a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_fields_fail_validation() {
        let request = RegisterUserRequest {
            username: "  ".into(),
            email: "a@b.c".into(),
            password: "pw".into(),
            full_name: "\t".into(),
        };

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("full_name"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn public_user_drops_secrets() {
        let now = Utc::now();
        let user = User {
            id: 1,
            username: "ada".into(),
            email: "ada@example.com".into(),
            full_name: "Ada".into(),
            avatar: "http://cdn/a.png".into(),
            cover_image: String::new(),
            watch_history: vec![3, 1],
            password: "$argon2id$hash".into(),
            refresh_token: Some("token".into()),
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("refreshToken").is_none());
        assert_eq!(value["watchHistory"], serde_json::json!([3, 1]));
    }
}
