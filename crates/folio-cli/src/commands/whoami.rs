//! Whoami command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use crate::output;
use crate::session::storage::SessionFile;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub fn run(file: SessionFile, _args: WhoamiArgs) -> Result<()> {
    let stored = file
        .load()
        .context("Failed to load session")?
        .context("No active session. Run 'folio login' first.")?;
    let identity = stored.session.identity();

    output::field("User", identity.id.as_str());
    if let Some(email) = &identity.email {
        output::field("Email", email);
    }
    output::field("Project", &stored.project_url.to_string());
    output::field(
        "Expires",
        &output::expiry(stored.session.expires_at(), Utc::now()),
    );

    Ok(())
}
