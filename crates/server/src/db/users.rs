//! User and profile repository.

use sqlx::PgPool;

use cafe_passport_core::{Theme, UserId};

use super::RepositoryError;
use crate::models::{Profile, User};

/// Fields needed to create an account.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_staff: bool,
    pub display_name: &'a str,
    pub home_city: &'a str,
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    id: UserId,
    username: String,
    email: String,
    is_staff: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a user and their profile in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_profile(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r"
            INSERT INTO passport.app_user (username, email, password_hash, is_staff)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, is_staff, created_at
            ",
        )
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.is_staff)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "username"))?;

        sqlx::query(
            r"
            INSERT INTO passport.profile (user_id, display_name, home_city)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(user.id)
        .bind(new.display_name)
        .bind(new.home_city)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, username, email, is_staff, created_at
            FROM passport.app_user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user together with their password hash for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r"
            SELECT id, username, email, is_staff, created_at, password_hash
            FROM passport.app_user
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| {
            (
                User {
                    id: r.id,
                    username: r.username,
                    email: r.email,
                    is_staff: r.is_staff,
                    created_at: r.created_at,
                },
                r.password_hash,
            )
        }))
    }

    /// Get a user's profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, including when
    /// the stored theme is not a known identifier.
    pub async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r"
            SELECT user_id, display_name, bio, home_city, profile_picture, theme
            FROM passport.profile
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(profile)
    }

    /// Get the stored theme, `None` if the user has no profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_theme(&self, user_id: UserId) -> Result<Option<Theme>, RepositoryError> {
        let theme = sqlx::query_scalar::<_, Theme>(
            "SELECT theme FROM passport.profile WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(theme)
    }

    /// Store a theme, creating the profile if it is missing.
    ///
    /// Setting the current theme again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_theme(&self, user_id: UserId, theme: Theme) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO passport.profile (user_id, theme)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET theme = EXCLUDED.theme
            ",
        )
        .bind(user_id)
        .bind(theme)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }
}
