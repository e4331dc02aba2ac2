//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! PASSPORT_NEW_USER_PASSWORD=... passport-cli user create -u alice -e alice@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `PASSPORT_NEW_USER_PASSWORD` - Password for the new account

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use cafe_passport_server::services::auth::{AuthError, AuthService, SignupInput};

/// Environment variable the new account's password is read from.
pub const PASSWORD_VAR: &str = "PASSPORT_NEW_USER_PASSWORD";

/// Errors that can occur while creating a user.
#[derive(Debug, Error)]
pub enum UserCommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Signup rejected or failed.
    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Create a new user with a profile.
///
/// # Errors
///
/// Returns an error if the password variable is unset, a field is invalid,
/// the username is taken, or the database is unreachable.
pub async fn create_user(
    username: &str,
    email: &str,
    display_name: &str,
    home_city: &str,
    staff: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let password = std::env::var(PASSWORD_VAR)
        .map(SecretString::from)
        .map_err(|_| UserCommandError::MissingEnvVar(PASSWORD_VAR))?;

    let input = SignupInput {
        username: username.to_owned(),
        email: email.to_owned(),
        password: password.expose_secret().to_owned(),
        display_name: display_name.to_owned(),
        home_city: home_city.to_owned(),
    };

    tracing::info!(%username, staff, "Creating user");
    let user = AuthService::new(&pool)
        .register(&input, staff)
        .await
        .map_err(UserCommandError::from)?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(())
}
