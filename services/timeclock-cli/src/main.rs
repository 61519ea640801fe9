//! Timeclock command-line client
//!
//! Single-process session against the timeclock API:
//! 1. Logs in with the configured account (cookie jar and access token
//!    live only for this process)
//! 2. Optionally keeps the access token fresh in the background
//! 3. Runs one command through the authorized request pipeline
//! 4. Logs out

mod cli;
mod config;
mod error;

use std::sync::Arc;

use anyhow::{Context, Result};
use api_client::{
    ApiClient, ApiRequest, AuthSession, DomainError, LoggingNavigator, spawn_refresh_task,
};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clap::Parser;

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr so stdout carries only the command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let password = config
        .account
        .password
        .clone()
        .context("no password configured: set TIMECLOCK_PASSWORD or account.password_file")?;

    info!(
        base_url = %config.api.base_url,
        email = %config.account.email,
        proactive_refresh = config.session.proactive_refresh,
        "configuration loaded"
    );

    let store = Arc::new(config.credential_store());
    let client = ApiClient::new(config.client_config(), store, Arc::new(LoggingNavigator))
        .context("failed to build API client")?;
    let session = AuthSession::new(client.clone());

    session
        .login(&config.account.email, &password)
        .await
        .map_err(describe)
        .context("login failed")?;

    let refresher = config.session.proactive_refresh.then(|| {
        spawn_refresh_task(
            client.refresh_protocol().clone(),
            config.refresh_check_interval(),
        )
    });

    let outcome = run(&session, cli.command).await;

    if let Some(task) = refresher {
        task.abort();
    }
    if let Err(e) = session.logout().await {
        warn!(error = %e, "logout failed");
    }

    let value = outcome.map_err(describe).context("command failed")?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn run(session: &AuthSession, command: Command) -> Result<Value, DomainError> {
    match command {
        Command::Me => {
            let user = session.me().await?;
            info!(user_id = %user.id, role = ?user.role, "fetched current user");
            serde_json::to_value(user).map_err(|e| {
                DomainError::new(api_client::ErrorKind::Server, format!("unprintable user: {e}"))
            })
        }
        Command::Request { method, path, body } => {
            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                request = request.body_value(body);
            }
            session.client().request(request).await
        }
    }
}

/// Turn a pipeline error into something worth printing.
fn describe(error: DomainError) -> anyhow::Error {
    match error.field_errors() {
        Some(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(field, message)| format!("{field}: {message}"))
                .collect();
            anyhow::anyhow!("{} ({})", error.user_message(), fields.join(", "))
        }
        None => anyhow::anyhow!("{}", error.user_message()),
    }
}
