//! Session storage for persisting login state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use folio_core::{ProjectUrl, Session};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// What `folio login` leaves on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub project_url: ProjectUrl,
    pub session: Session,
}

/// Location of the session file.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// The per-user data directory, e.g. `~/.local/share/folio/session.json`.
    pub fn default_location() -> Result<Self> {
        let dirs =
            ProjectDirs::from("", "", "folio").context("Could not determine data directory")?;
        Ok(Self::at(dirs.data_dir().join("session.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save a session to disk, readable by the owner only.
    pub fn save(&self, stored: &StoredSession) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("Failed to create data directory")?;
        }

        let json = serde_json::to_string_pretty(stored)?;
        fs::write(&self.path, &json).context("Failed to write session file")?;

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    /// Load the stored session, if any.
    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path).context("Failed to read session file")?;
        let stored = serde_json::from_str(&json).context("Invalid session file")?;
        Ok(Some(stored))
    }

    /// Remove the stored session. Missing files are fine.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}
