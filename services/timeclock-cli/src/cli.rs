//! Command-line interface

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "timeclock")]
#[command(about = "Timeclock API client: logs in, runs one command, logs out", long_about = None)]
pub struct Cli {
    /// Config file path (falls back to timeclock.toml)
    #[arg(long, global = true, env = "CONFIG_PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do once logged in.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the authenticated user
    Me,

    /// Send one request through the authorized pipeline and print the body
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS)
        #[arg(value_parser = parse_method)]
        method: Method,

        /// Path relative to the versioned API base, e.g. /clocks/status
        #[arg(value_parser = parse_path)]
        path: String,

        /// JSON request body
        #[arg(value_parser = parse_json)]
        body: Option<Value>,
    },
}

fn parse_method(raw: &str) -> Result<Method> {
    let upper = raw.to_ascii_uppercase();
    match upper.as_str() {
        "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD" | "OPTIONS" => {
            Method::from_bytes(upper.as_bytes()).map_err(|_| Error::InvalidMethod(raw.into()))
        }
        _ => Err(Error::InvalidMethod(raw.into())),
    }
}

fn parse_path(raw: &str) -> Result<String> {
    if raw.starts_with('/') {
        Ok(raw.to_string())
    } else {
        Err(Error::InvalidPath(raw.into()))
    }
}

fn parse_json(raw: &str) -> Result<Value> {
    Ok(serde_json::from_str(raw)?)
}
