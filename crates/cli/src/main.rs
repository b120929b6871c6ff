//! Jack Machine CLI - operator tools for the portal's data service.
//!
//! # Usage
//!
//! ```bash
//! # Give an existing account access to the admin console
//! jm-cli admin grant -e staff@jackmachine.example
//!
//! # Take it away again
//! jm-cli admin revoke -e staff@jackmachine.example
//!
//! # Load services and job listings from YAML
//! jm-cli seed catalog -f seed/catalog.yaml
//!
//! # Validate the file without writing anything
//! jm-cli seed catalog -f seed/catalog.yaml --dry-run
//!
//! # Check that the data service answers
//! jm-cli check
//!
//! # Save an applicant's resume locally
//! jm-cli resume fetch -k 42/1718000000-cv.pdf -o cv.pdf
//! ```
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` - Project URL
//! - `SUPABASE_ANON_KEY` - Public key
//! - `SUPABASE_SERVICE_ROLE_KEY` - Required for `admin`, `seed` and `resume`
//! - `SUPABASE_RESUME_BUCKET` - Bucket holding resumes (default `resumes`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "jm-cli")]
#[command(author, version, about = "Jack Machine portal CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage admin console access
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the data service
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Check that the data service is reachable
    Check,
    /// Work with uploaded resumes
    Resume {
        #[command(subcommand)]
        action: ResumeAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to an existing account
    Grant {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Revoke the admin role from an account
    Revoke {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert services and job listings from a YAML file
    Catalog {
        /// Path to the catalog file
        #[arg(short, long, default_value = "seed/catalog.yaml")]
        file: String,

        /// Validate only; write nothing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum ResumeAction {
    /// Download a resume by its storage key
    Fetch {
        /// Object key as stored on the application row
        #[arg(short, long)]
        key: String,

        /// Output path (defaults to the key's file name)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::grant(&email).await?,
            AdminAction::Revoke { email } => commands::admin::revoke(&email).await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file, dry_run } => {
                commands::seed::catalog(&file, dry_run).await?;
            }
        },
        Commands::Check => commands::check::run().await?,
        Commands::Resume { action } => match action {
            ResumeAction::Fetch { key, output } => {
                commands::resume::fetch(&key, output.as_deref()).await?;
            }
        },
    }
    Ok(())
}
