//! The CLI's session: env or file token, terminal login prompt.

use pcbcam_client::{normalize_token, SessionContext};
use tracing::warn;

use crate::store::CredentialStore;

/// Environment variable holding an API key that overrides the stored one.
pub const API_KEY_ENV: &str = "PCBCAM_API_KEY";

/// Session backed by `$PCBCAM_API_KEY` or the credential store.
#[derive(Debug, Clone)]
pub struct CliSession {
    env_token: Option<String>,
    store: CredentialStore,
}

impl CliSession {
    /// Create a session reading the environment once and the store per call.
    pub fn new(store: CredentialStore) -> Self {
        Self {
            env_token: normalize_token(std::env::var(API_KEY_ENV).ok()),
            store,
        }
    }

    /// The backing credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }
}

impl SessionContext for CliSession {
    fn token(&self) -> Option<String> {
        if let Some(token) = &self.env_token {
            return Some(token.clone());
        }
        self.store.load().unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable credentials");
            None
        })
    }

    fn notify_auth_required(&self) {
        eprintln!("🔒 Authentication required. Run `pcbcam login` or set {}.", API_KEY_ENV);
    }
}
