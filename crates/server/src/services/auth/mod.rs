//! Authentication service.
//!
//! Username/password accounts with Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;

use cafe_passport_core::FieldErrors;

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const MAX_USERNAME_CHARS: usize = 150;
const MAX_FIELD_CHARS: usize = 255;

/// Signup form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub home_city: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user together with their profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` if a field is missing or malformed.
    /// Returns `AuthError::UserAlreadyExists` if the username is taken.
    pub async fn register(&self, input: &SignupInput, is_staff: bool) -> Result<User, AuthError> {
        validate_signup(input).map_err(AuthError::Invalid)?;

        let password_hash = hash_password(&input.password)?;

        let user = self
            .users
            .create_with_profile(&NewUser {
                username: input.username.trim(),
                email: input.email.trim(),
                password_hash: &password_hash,
                is_staff,
                display_name: input.display_name.trim(),
                home_city: input.home_city.trim(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_password_hash(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

/// Validate signup fields.
fn validate_signup(input: &SignupInput) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    let username = input.username.trim();
    if username.is_empty() {
        errors.add("username", "This field is required.");
    } else if username.chars().count() > MAX_USERNAME_CHARS {
        errors.add(
            "username",
            format!("must be at most {MAX_USERNAME_CHARS} characters"),
        );
    } else if !username.chars().all(is_username_char) {
        errors.add(
            "username",
            "may contain only letters, numbers and @/./+/-/_ characters",
        );
    }

    let email = input.email.trim();
    let looks_like_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !looks_like_email {
        errors.add("email", "Enter a valid email address.");
    }

    if input.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }

    for (field, value) in [
        ("display_name", &input.display_name),
        ("home_city", &input.home_city),
    ] {
        if value.trim().chars().count() > MAX_FIELD_CHARS {
            errors.add(field, format!("must be at most {MAX_FIELD_CHARS} characters"));
        }
    }

    errors.into_result(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
