//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod users;

use cafe_passport_server::db;
use secrecy::SecretString;
use sqlx::PgPool;

/// Environment variable holding the database URL.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Load `.env`, read `DATABASE_URL` and connect.
///
/// # Errors
///
/// Returns an error if the variable is unset or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var(DATABASE_URL_VAR)
        .map(SecretString::from)
        .map_err(|_| format!("{DATABASE_URL_VAR} not set"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;
    Ok(pool)
}
