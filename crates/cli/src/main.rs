//! Cafe Passport CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (schema + session table)
//! passport-cli migrate
//!
//! # Create a user (password read from PASSPORT_NEW_USER_PASSWORD)
//! passport-cli user create -u alice -e alice@example.com -d "Alice" -c Portland
//!
//! # Create a staff user
//! passport-cli user create -u admin -e admin@example.com --staff
//!
//! # Seed tags and sticker types
//! passport-cli seed catalog -f demos/catalog.yaml
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create accounts
//! - `seed catalog` - Load the tag and sticker catalog from YAML

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "passport-cli")]
#[command(author, version, about = "Cafe Passport CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user with a profile
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name shown on the profile
        #[arg(short, long, default_value = "")]
        display_name: String,

        /// Home city
        #[arg(short = 'c', long, default_value = "")]
        home_city: String,

        /// Grant staff rights (cafe deletion)
        #[arg(long)]
        staff: bool,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load tags and sticker types from a YAML file
    Catalog {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                display_name,
                home_city,
                staff,
            } => {
                commands::users::create_user(&username, &email, &display_name, &home_city, staff)
                    .await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
    }
    Ok(())
}
