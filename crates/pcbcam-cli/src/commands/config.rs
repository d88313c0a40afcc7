//! Config command implementation.
//!
//! Manages the client configuration file.

use anyhow::Result;
use pcbcam_client::ClientConfig;

use crate::session::API_KEY_ENV;
use crate::store::CredentialStore;

/// Keys accepted by `config get` / `config set`.
const KEYS: &str = "site, api_prefix, excluded_namespaces, login_namespace, login_procedure";

/// Show current configuration.
pub fn show(config: &ClientConfig, store: &CredentialStore) -> Result<()> {
    println!("PCB CAM Client Configuration");
    println!("{:-<40}", "");

    println!("Site:                {}", config.site);
    println!("API Prefix:          {}", config.api_prefix);
    println!("Endpoints URL:       {}", config.endpoints_url());
    println!(
        "Excluded Namespaces: {}",
        if config.excluded_namespaces.is_empty() {
            "(none)".to_string()
        } else {
            config.excluded_namespaces.join(", ")
        }
    );
    println!(
        "Login Procedure:     {}.{}",
        config.login_namespace, config.login_procedure
    );

    let logged_in = std::env::var(API_KEY_ENV).is_ok() || store.load()?.is_some();
    println!(
        "API Key:             {}",
        if logged_in { "(set)" } else { "(not set)" }
    );

    if let Some(config_path) = ClientConfig::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }
    println!("Credentials: {}", store.path().display());

    Ok(())
}

/// Set a configuration value.
pub fn set(config: &mut ClientConfig, key: &str, value: &str) -> Result<()> {
    let key = normalize_key(key);
    if config.get(&key).is_none() {
        anyhow::bail!("Unknown config key: {}. Valid keys: {}", key, KEYS);
    }

    config.set(&key, value)?;
    config.save()?;
    println!("Set {} to: {}", key, value);
    Ok(())
}

/// Get a configuration value.
pub fn get(config: &ClientConfig, key: &str) -> Result<()> {
    let key = normalize_key(key);
    match config.get(&key) {
        Some(value) => println!("{}", value),
        None => anyhow::bail!("Unknown config key: {}. Valid keys: {}", key, KEYS),
    }
    Ok(())
}

/// Reset configuration to defaults.
pub fn reset() -> Result<()> {
    ClientConfig::default().save()?;
    println!("Configuration reset to defaults");
    Ok(())
}

/// Accept `api-prefix` as well as `api_prefix`.
fn normalize_key(key: &str) -> String {
    key.trim().replace('-', "_")
}
