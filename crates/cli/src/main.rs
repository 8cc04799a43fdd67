//! Parcsal CLI - status checks and access dry-runs against the backend.
//!
//! # Usage
//!
//! ```bash
//! # Onboarding status of the token's company
//! parcsal status onboarding --type company
//!
//! # Payment-provider linkage
//! parcsal status connect
//!
//! # Poll until payout setup completes (or times out)
//! parcsal watch --step payout_setup
//!
//! # Evaluate the access gate without a server
//! parcsal gate --path /company/payouts --role company_staff --unverified
//!
//! # Navigation menu for a role
//! parcsal nav --role company_admin
//! ```
//!
//! # Environment Variables
//!
//! - `PARCSAL_API_URL` - Backend base URL (status and watch)
//! - `PARCSAL_ACCESS_TOKEN` - Bearer token to query as (status and watch)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use parcsal_core::{Role, StepKey, SubjectType};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "parcsal")]
#[command(author, version, about = "Parcsal operator tools")]
struct Cli {
    /// Bearer token for backend calls
    #[arg(long, env = "PARCSAL_ACCESS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a status snapshot from the backend
    Status {
        #[command(subcommand)]
        target: StatusTarget,
    },
    /// Poll onboarding until a step completes
    Watch {
        /// Onboarding subject (`user` or `company`)
        #[arg(long = "type", default_value = "company")]
        subject: SubjectType,

        /// Step to wait for
        #[arg(long, default_value = "payout_setup")]
        step: StepKey,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 5_000)]
        interval_ms: u64,

        /// Give up after this many milliseconds
        #[arg(long, default_value_t = 300_000)]
        max_ms: u64,
    },
    /// Evaluate the access gate for a hypothetical session
    Gate {
        /// Target path, optionally with a query string
        #[arg(long)]
        path: String,

        /// Session role; omit for a logged-out visitor
        #[arg(long)]
        role: Option<Role>,

        /// Session email is not verified
        #[arg(long)]
        unverified: bool,

        /// Session onboarding is not completed
        #[arg(long)]
        onboarding_incomplete: bool,
    },
    /// Print the navigation menu a role sees
    Nav {
        #[arg(long)]
        role: Role,
    },
}

#[derive(Subcommand)]
enum StatusTarget {
    /// `GET /onboarding/status`
    Onboarding {
        /// Onboarding subject (`user` or `company`)
        #[arg(long = "type", default_value = "company")]
        subject: SubjectType,
    },
    /// `GET /company/connect/status`
    Connect,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let token = cli.token.map(SecretString::from);

    match cli.command {
        Commands::Status { target } => match target {
            StatusTarget::Onboarding { subject } => {
                commands::status::onboarding(token, subject).await?;
            }
            StatusTarget::Connect => commands::status::connect(token).await?,
        },
        Commands::Watch {
            subject,
            step,
            interval_ms,
            max_ms,
        } => {
            commands::status::watch(token, subject, step, interval_ms, max_ms).await?;
        }
        Commands::Gate {
            path,
            role,
            unverified,
            onboarding_incomplete,
        } => {
            commands::access::gate(&path, role, !unverified, !onboarding_incomplete)?;
        }
        Commands::Nav { role } => commands::access::nav(role),
    }
    Ok(())
}
