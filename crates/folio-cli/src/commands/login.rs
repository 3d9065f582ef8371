//! Login command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use folio_core::Credentials;

use crate::cli::ProjectArgs;
use crate::output;
use crate::session::storage::SessionFile;
use crate::session::{CliSession, client_config};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "FOLIO_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(project: &ProjectArgs, file: SessionFile, args: LoginArgs) -> Result<()> {
    let stored = file.load().ok().flatten();
    let config = client_config(project, stored.as_ref().map(|s| &s.project_url))?;
    let credentials = Credentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let cli = CliSession::fresh(config, file).await?;
    let session = cli
        .store()
        .sign_in_with_password(&credentials)
        .await
        .context("Failed to login")?;

    let project_url = cli.config().project_url.to_string();
    cli.close().await.context("Failed to save session")?;

    output::success("Logged in successfully");
    output::field("User", session.identity().id.as_str());
    if let Some(email) = &session.identity().email {
        output::field("Email", email);
    }
    output::field("Project", &project_url);
    output::field(
        "Expires",
        &output::expiry(session.expires_at(), Utc::now()),
    );

    Ok(())
}
