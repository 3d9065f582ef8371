//! Invoke command implementation.

use std::io::{self, Read};

use anyhow::{Context, Result};
use chrono::Duration;
use clap::Args;
use serde_json::Value;

use folio_core::FunctionName;
use folio_session::{InvokeOptions, ResilientInvoker};

use crate::cli::ProjectArgs;
use crate::output;
use crate::session::CliSession;
use crate::session::storage::SessionFile;

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Function name (e.g., render-pdf)
    pub function: String,

    /// JSON file with the request body (use - for stdin)
    #[arg(long)]
    pub json: Option<String>,

    /// Extra request header as NAME=VALUE (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Do not refresh and retry when the call is rejected as unauthorized
    #[arg(long)]
    pub no_retry: bool,

    /// Refresh tokens expiring within this many seconds before calling
    #[arg(long)]
    pub refresh_skew: Option<i64>,

    /// Print the response as compact JSON
    #[arg(long)]
    pub compact: bool,
}

pub async fn run(project: &ProjectArgs, file: SessionFile, args: InvokeArgs) -> Result<()> {
    let function = FunctionName::new(&args.function).context("Invalid function name")?;
    let body = read_body(args.json.as_deref())?;

    let cli = CliSession::open(project, file).await?;
    if cli.store().current().is_none() {
        output::hint("No active session; calling without authorization.");
    }

    let skew = args
        .refresh_skew
        .map(Duration::seconds)
        .unwrap_or_else(|| cli.config().refresh_skew());
    let mut options = InvokeOptions::new()
        .with_retry_on_auth_error(!args.no_retry)
        .with_refresh_skew(skew);
    if let Some(body) = body {
        options = options.with_body(body);
    }
    for (name, value) in args.headers {
        options = options.with_header(name, value);
    }

    let invoker = ResilientInvoker::new(cli.store().clone(), cli.transport());
    let invocation = invoker.invoke(&function, options).await;
    let auth_failure = invocation.is_auth_failure();

    // The call may have refreshed or ended the session.
    cli.close().await.context("Failed to save session")?;

    match invocation.into_result() {
        Ok(data) => {
            if args.compact {
                output::json(&data)
            } else {
                output::json_pretty(&data)
            }
        }
        Err(e) => {
            let status = e
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "no response".to_string());
            output::error(&format!("{function} failed ({status}): {e}"));
            if let Some(body) = &e.body {
                output::json_pretty(body)?;
            }
            if auth_failure {
                output::hint("The session was rejected. Run 'folio login' again.");
            }
            Err(e).context(format!("Function '{function}' failed"))
        }
    }
}

fn read_body(source: Option<&str>) -> Result<Option<Value>> {
    let Some(path) = source else {
        return Ok(None);
    };

    let text = if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).context("Failed to read JSON file")?
    };

    let value = serde_json::from_str(&text).context("Invalid JSON body")?;
    Ok(Some(value))
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name must not be empty".to_string());
    }
    Ok((name.to_string(), value.to_string()))
}
