//! CLI command implementations.

pub mod auth;
pub mod call;
pub mod config;
pub mod endpoints;

use std::sync::Arc;

use anyhow::{Context, Result};
use pcbcam_client::{Client, ClientConfig};

use crate::session::CliSession;

/// Fetch the endpoint descriptor and build the client.
pub async fn connect(config: &ClientConfig, session: &CliSession) -> Result<Client> {
    Client::connect(config, Arc::new(session.clone()))
        .await
        .with_context(|| format!("Failed to load endpoints from {}", config.endpoints_url()))
}
