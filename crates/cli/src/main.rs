//! Abandoned cart CLI - migrations, manual sweeps and cart management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ac-cli migrate
//!
//! # Run one abandonment sweep now
//! ac-cli sweep
//!
//! # Inspect and act on cart records
//! ac-cli carts list --status pending --limit 20
//! ac-cli carts resend 42
//! ac-cli carts recover 42
//! ac-cli carts delete 42
//!
//! # Tracker settings
//! ac-cli settings get
//! ac-cli settings set timeout_minutes 90
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `sweep` - Detect and deliver abandoned carts, then expire old ones
//! - `carts` - List, resend, recover or delete cart records
//! - `settings` - Show or change the tracker settings

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ac-cli")]
#[command(author, version, about = "Abandoned cart tracker CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Run one abandonment sweep
    Sweep,
    /// Manage cart records
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
    /// Show or change tracker settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum CartsAction {
    /// List carts, newest first
    List {
        /// Only carts with this status (`pending`, `recovered`, `expired`)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of carts to show
        #[arg(short, long, default_value_t = 100)]
        limit: i64,
    },
    /// Send a cart to the webhook now
    Resend {
        /// Cart record ID
        id: i64,
    },
    /// Mark a pending cart recovered
    Recover {
        /// Cart record ID
        id: i64,
    },
    /// Delete a cart record
    Delete {
        /// Cart record ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective settings
    Get,
    /// Change one setting
    Set {
        /// `webhook_url`, `timeout_minutes`, `logging_enabled` or `expiry_days`
        key: String,

        /// New value (empty string clears the webhook URL)
        value: String,
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
        Commands::Sweep => commands::sweep::run().await?,
        Commands::Carts { action } => {
            let state = commands::connect().await?;
            match action {
                CartsAction::List { status, limit } => {
                    commands::carts::list(&state, status, limit).await?;
                }
                CartsAction::Resend { id } => commands::carts::resend(&state, id).await?,
                CartsAction::Recover { id } => commands::carts::recover(&state, id).await?,
                CartsAction::Delete { id } => commands::carts::delete(&state, id).await?,
            }
        }
        Commands::Settings { action } => {
            let state = commands::connect().await?;
            match action {
                SettingsAction::Get => commands::settings::get(&state).await?,
                SettingsAction::Set { key, value } => {
                    commands::settings::set(&state, &key, &value).await?;
                }
            }
        }
    }
    Ok(())
}
