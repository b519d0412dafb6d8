//! Keeper command-line client
//!
//! Drives the OAuth2 authorization code flow against the Keeper realm and
//! runs document actions with the resulting credential:
//! 1. `keeper authorize <redirect_uri>` prints the consent URL and a state value
//! 2. `keeper token <redirect_uri> <code>` exchanges the returned code
//! 3. `keeper get|post|put|delete` call the document API, refreshing as needed
//!
//! Every credential change is persisted to `credentials_path`.

mod command;
mod config;
mod error;
mod store;

use std::time::Duration;

use anyhow::{Context, Result};
use keeper_auth::{Credentials, generate_state};
use keeper_client::KeeperClient;
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::{Command, parse_payload, run_action, split_config_arg};
use crate::config::Config;
use crate::store::CredentialFile;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr so stdout stays a clean JSON result
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cli_config_path, rest) = split_config_arg(&args);
    let command = Command::parse(&rest)?;

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let store = CredentialFile::new(config.keeper.credentials_path.clone());
    let stored = store
        .load()
        .with_context(|| format!("failed to read credentials from {}", store.path().display()))?;
    let credentials = config.credentials(stored)?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let client = KeeperClient::with_listener(credentials, http_client, move |creds| {
        if let Err(e) = store.save(creds) {
            warn!(error = %e, path = %store.path().display(), "failed to persist credentials");
        }
    });

    let output = run(&client, command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(client: &KeeperClient, command: Command) -> Result<Value> {
    match command {
        Command::Authorize { redirect_uri } => {
            let state = generate_state();
            let url = client.tokens().authorization_url(&redirect_uri, &state)?;
            Ok(json!({ "url": url, "state": state }))
        }
        Command::Token { redirect_uri, code } => {
            let creds = client.tokens().exchange_code(&redirect_uri, &code).await?;
            info!(display_name = ?creds.display_name, "authorization code exchanged");
            Ok(summary(&creds))
        }
        Command::Refresh => {
            let creds = client.tokens().refresh_access_token().await?;
            Ok(summary(&creds))
        }
        Command::Document { action, id } => {
            let payload = if action.takes_payload() {
                let mut input = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut input)
                    .await
                    .context("failed to read stdin")?;
                parse_payload(&input)?
            } else {
                Value::Null
            };
            Ok(run_action(client.api(), action, id.as_deref(), payload).await?)
        }
    }
}

/// Token state without the tokens themselves.
fn summary(creds: &Credentials) -> Value {
    json!({
        "displayName": creds.display_name,
        "tokenType": creds.token_type,
        "expiresIn": creds.expires_in,
        "expireTime": creds.expire_time,
    })
}
