//! Introspection commands: endpoints, describe, whoami.

use anyhow::Result;
use pcbcam_client::ClientConfig;

use super::connect;
use crate::session::CliSession;

/// List every namespace and its procedures.
pub async fn list(config: &ClientConfig, session: &CliSession) -> Result<()> {
    let client = connect(config, session).await?;

    println!("📡 Endpoints at {}", client.site());
    println!("{:─<50}", "");

    for namespace in client.namespaces() {
        println!();
        println!("📦 {} ({} procedures)", namespace.name(), namespace.len());
        for procedure in namespace.procedures() {
            let lock = if procedure.info().requires_login() {
                " 🔒"
            } else {
                ""
            };
            println!("   • {}{}", procedure.name(), lock);
        }
    }

    if client.namespace_names().next().is_none() {
        println!();
        println!("⚠️  The server published no namespaces");
    }

    Ok(())
}

/// Print one procedure's URL and metadata.
pub async fn describe(
    config: &ClientConfig,
    session: &CliSession,
    namespace: &str,
    procedure: &str,
) -> Result<()> {
    let client = connect(config, session).await?;
    let procedure = client.procedure(namespace, procedure)?;

    println!("🔗 {} → POST {}", procedure, procedure.url());
    let params = procedure.info().parameter_names();
    if !params.is_empty() {
        println!("   Parameters: {}", params.join(", "));
    }
    let file_keys = procedure.info().file_keys();
    if !file_keys.is_empty() {
        println!("   File fields: {}", file_keys.join(", "));
    }
    println!();
    println!("{}", serde_json::to_string_pretty(procedure.info())?);

    Ok(())
}

/// Show the user the server associates with the current token.
pub async fn whoami(config: &ClientConfig, session: &CliSession) -> Result<()> {
    let client = connect(config, session).await?;

    match client.session_user() {
        Some(user) if user.authenticated => {
            println!(
                "👤 {} (id {})",
                user.username.as_deref().unwrap_or("(unnamed)"),
                user.id
            );
        }
        Some(_) => println!("👤 Anonymous"),
        None => println!("ℹ️  The server did not report a session user"),
    }

    Ok(())
}
