//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::ProjectArgs;
use crate::output;
use crate::session::CliSession;
use crate::session::storage::SessionFile;

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Forget the local session even if the server cannot be reached
    #[arg(long)]
    pub force: bool,
}

pub async fn run(project: &ProjectArgs, file: SessionFile, args: LogoutArgs) -> Result<()> {
    if file.load().context("Failed to load session")?.is_none() {
        output::success("Not logged in");
        return Ok(());
    }

    let cli = CliSession::open(project, file.clone()).await?;
    let result = cli.store().sign_out().await;
    cli.close().await.context("Failed to update session file")?;

    match result {
        Ok(()) => {}
        Err(e) if args.force => {
            output::error(&format!("Server sign-out failed: {e}"));
            file.clear()?;
        }
        Err(e) => {
            return Err(e).context("Failed to sign out (use --force to forget the session anyway)");
        }
    }

    output::success("Logged out");
    Ok(())
}
