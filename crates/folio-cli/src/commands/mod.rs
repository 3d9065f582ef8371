//! Subcommand implementations.

pub mod invoke;
pub mod login;
pub mod logout;
pub mod refresh_token;
pub mod whoami;

use anyhow::Result;

use crate::cli::{Commands, ProjectArgs};
use crate::session::storage::SessionFile;

pub async fn handle(project: ProjectArgs, command: Commands) -> Result<()> {
    let file = SessionFile::default_location()?;

    match command {
        Commands::Login(args) => login::run(&project, file, args).await,
        Commands::Whoami(args) => whoami::run(file, args),
        Commands::RefreshToken(args) => refresh_token::run(&project, file, args).await,
        Commands::Logout(args) => logout::run(&project, file, args).await,
        Commands::Invoke(args) => invoke::run(&project, file, args).await,
    }
}
