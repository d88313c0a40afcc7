//! Login and logout.

use anyhow::{Context, Result};
use pcbcam_client::ClientConfig;
use serde_json::{json, Value};
use tracing::info;

use super::connect;
use crate::session::CliSession;

/// Pull the API key out of a login response.
///
/// The login procedure answers with the bare key; `{"key": ...}` and
/// `{"token": ...}` wrappers are accepted too.
pub fn extract_token(payload: &Value) -> Option<&str> {
    let token = match payload {
        Value::String(s) => s.as_str(),
        Value::Object(map) => ["key", "token", "api_key"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))?,
        _ => return None,
    };
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Exchange a username and password for an API key and store it.
pub async fn login(
    config: &ClientConfig,
    session: &CliSession,
    username: &str,
    password: &str,
) -> Result<()> {
    let client = connect(config, session).await?;
    let procedure = client.procedure(&config.login_namespace, &config.login_procedure)?;

    let payload = procedure
        .call(json!({"username": username, "password": password}))
        .await
        .context("Login failed")?;
    let token = extract_token(&payload)
        .with_context(|| format!("Login response did not contain an API key: {}", payload))?;

    session.store().save(token)?;
    info!(username, path = %session.store().path().display(), "Stored API key");
    println!("✅ Logged in as {}", username);
    Ok(())
}

/// Forget the stored API key.
pub fn logout(session: &CliSession) -> Result<()> {
    if session.store().clear()? {
        println!("✅ Logged out");
    } else {
        println!("ℹ️  Not logged in");
    }
    Ok(())
}
