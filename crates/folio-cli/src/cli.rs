//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

use crate::commands::{invoke, login, logout, refresh_token, whoami};

/// Sign in to a folio project and call its remote functions.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version = env!("FOLIO_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the project lives. Falls back to the project of the stored session.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project base URL
    #[arg(long = "url", env = "FOLIO_URL", global = true)]
    pub url: Option<String>,

    /// Project API key
    #[arg(long, env = "FOLIO_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = folio_http::DEFAULT_TIMEOUT_SECONDS)]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login(login::LoginArgs),

    /// Display the stored session
    Whoami(whoami::WhoamiArgs),

    /// Refresh the session tokens
    RefreshToken(refresh_token::RefreshTokenArgs),

    /// Sign out and forget the stored session
    Logout(logout::LogoutArgs),

    /// Call a remote function
    Invoke(invoke::InvokeArgs),
}
