//! Tally Control - CLI client for the Tally daemon
//!
//! Talks to tallyd over HTTP and renders the analytics and gamification
//! views in the terminal. The acting user comes from --user or TALLY_USER;
//! the daemon address from --server or TALLY_SERVER.

mod client;
mod commands;
mod errors;

use clap::{Parser, Subcommand};
use client::TallyClient;
use errors::{
    EXIT_DAEMON_UNAVAILABLE, EXIT_GENERAL_ERROR, EXIT_INVALID_RESPONSE, EXIT_SUCCESS,
};

const DEFAULT_SERVER: &str = "http://127.0.0.1:7868";

#[derive(Parser)]
#[command(name = "tallyctl")]
#[command(about = "Tally - exam performance analytics", long_about = None)]
#[command(version)]
struct Cli {
    /// Daemon base URL (falls back to TALLY_SERVER)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Acting user id (falls back to TALLY_USER)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon health and version
    Status,

    /// Overall score, grade, and per-topic breakdown
    Stats,

    /// Current and longest daily streak
    Streak,

    /// Points, experience, and level
    Points,

    /// Earned badges
    Badges,

    /// Top users by points
    Leaderboard,

    /// Show yourself on the leaderboard
    OptIn,

    /// Hide yourself from the leaderboard
    OptOut,

    /// Project your grade under hypothetical topic improvements
    Project {
        /// Improvement as TOPIC=POINTS, repeatable (0-20 percentage points)
        #[arg(long = "improve", value_name = "TOPIC=POINTS")]
        improve: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let server = cli
        .server
        .or_else(|| std::env::var("TALLY_SERVER").ok())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    let user = cli.user.or_else(|| std::env::var("TALLY_USER").ok());

    let client = match TallyClient::new(&server, user.as_deref()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_GENERAL_ERROR);
        }
    };

    let result = match cli.command {
        Commands::Status => commands::status(&client).await,
        Commands::Stats => commands::stats(&client).await,
        Commands::Streak => commands::streak(&client).await,
        Commands::Points => commands::points(&client).await,
        Commands::Badges => commands::badges(&client).await,
        Commands::Leaderboard => commands::leaderboard(&client).await,
        Commands::OptIn => commands::set_visibility(&client, true).await,
        Commands::OptOut => commands::set_visibility(&client, false).await,
        Commands::Project { improve } => commands::project(&client, &improve).await,
    };

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(exit_code_for(&e));
        }
    }
}

/// Map an error chain onto the documented exit codes.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            if e.is_connect() || e.is_timeout() {
                return EXIT_DAEMON_UNAVAILABLE;
            }
            if e.is_decode() {
                return EXIT_INVALID_RESPONSE;
            }
        }
    }
    EXIT_GENERAL_ERROR
}
