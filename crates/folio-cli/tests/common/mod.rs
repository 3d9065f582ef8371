#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const API_KEY: &str = "anon-key";

/// Run the CLI with a custom HOME for isolated session storage.
pub fn run_cli_with_env(args: &[&str], home: &Path, project_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_folio"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("FOLIO_URL", project_url);
    cmd.env("FOLIO_API_KEY", API_KEY);
    cmd.env_remove("FOLIO_PASSWORD");
    cmd.env_remove("RUST_LOG");
    cmd.env("NO_COLOR", "1");
    cmd.env("CLICOLOR", "0");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI with a custom HOME and expect success.
pub fn run_cli_with_env_success(args: &[&str], home: &Path, project_url: &str) -> String {
    let output = run_cli_with_env(args, home, project_url);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Where the CLI keeps its session under `home`.
pub fn session_file(home: &Path) -> PathBuf {
    home.join("data").join("folio").join("session.json")
}

/// Read the stored session file as JSON.
pub fn stored_session(home: &Path) -> Option<serde_json::Value> {
    let text = std::fs::read_to_string(session_file(home)).ok()?;
    serde_json::from_str(&text).ok()
}
