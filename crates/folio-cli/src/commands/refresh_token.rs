//! Refresh token command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use crate::cli::ProjectArgs;
use crate::output;
use crate::session::CliSession;
use crate::session::storage::SessionFile;

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(project: &ProjectArgs, file: SessionFile, _args: RefreshTokenArgs) -> Result<()> {
    let cli = CliSession::open_signed_in(project, file).await?;

    eprintln!("{}", "Refreshing session...".dimmed());

    let refreshed = cli.store().force_refresh().await;
    let session = cli.store().current();

    // Save whatever the refresh left behind, including a cleared session.
    cli.close()
        .await
        .context("Failed to save refreshed session")?;

    refreshed.context("Failed to refresh session")?;
    let session = session.context("Session ended. Run 'folio login' again.")?;

    output::success("Session refreshed successfully");
    output::field("User", session.identity().id.as_str());
    output::field(
        "Expires",
        &output::expiry(session.expires_at(), Utc::now()),
    );

    Ok(())
}
