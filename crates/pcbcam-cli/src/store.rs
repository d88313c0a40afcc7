//! Credential storage for the CLI.
//!
//! The API key returned by `pcbcam login` lives in a single file under the
//! platform data directory:
//!
//! ```text
//! <data_dir>/
//! └── api-key     # the raw token, nothing else
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use pcbcam_client::normalize_token;
use tracing::debug;

/// Name of the token file.
const TOKEN_FILE: &str = "api-key";

/// Environment variable overriding the token file location.
pub const CREDENTIALS_ENV: &str = "PCBCAM_CREDENTIALS_FILE";

/// File-backed credential storage.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the store at `$PCBCAM_CREDENTIALS_FILE` or the platform data dir.
    pub fn open_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CREDENTIALS_ENV) {
            return Ok(Self::new(path));
        }
        let dirs = ProjectDirs::from("com", "pcbcam", "pcbcam")
            .context("Could not determine a data directory for credentials")?;
        Ok(Self::new(dirs.data_dir().join(TOKEN_FILE)))
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token. A missing or blank file means no token.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials from {}", self.path.display()))?;
        Ok(normalize_token(Some(contents)))
    }

    /// Persist a token, replacing any previous one.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create credentials directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.path, token)
            .with_context(|| format!("Failed to write credentials to {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %self.path.display(), "Saved credentials");
        Ok(())
    }

    /// Remove the stored token. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        Ok(true)
    }
}
