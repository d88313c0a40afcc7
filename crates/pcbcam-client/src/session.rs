//! Session collaborators consumed by the invoker.
//!
//! The client holds no auth state of its own. Every call asks the
//! [`SessionContext`] for the current credential token, and a 403 answer is
//! reported back through [`SessionContext::notify_auth_required`].

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Header carrying the credential token.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Credential storage plus the "please log in" notifier.
pub trait SessionContext: Send + Sync {
    /// Current credential token, if any.
    fn token(&self) -> Option<String>;

    /// Called once for every call answered with 403.
    fn notify_auth_required(&self);
}

/// Normalize a raw token read from storage. Blank values mean "no token".
pub fn normalize_token(raw: Option<String>) -> Option<String> {
    raw.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// A session with no credentials that ignores auth prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousSession;

impl SessionContext for AnonymousSession {
    fn token(&self) -> Option<String> {
        None
    }

    fn notify_auth_required(&self) {}
}

type Notifier = Arc<dyn Fn() + Send + Sync>;

/// In-memory credential storage with an optional login-prompt callback.
///
/// Clones share the same token slot.
#[derive(Clone, Default)]
pub struct MemorySession {
    token: Arc<RwLock<Option<String>>>,
    on_auth_required: Option<Notifier>,
}

impl MemorySession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session holding the given token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_token(Some(token.into()));
        session
    }

    /// Install the callback run when the server answers 403.
    pub fn on_auth_required(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_auth_required = Some(Arc::new(f));
        self
    }

    /// Replace the stored token. Written by login/logout flows.
    pub fn set_token(&self, token: Option<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = normalize_token(token);
    }
}

impl SessionContext for MemorySession {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn notify_auth_required(&self) {
        if let Some(f) = &self.on_auth_required {
            f();
        }
    }
}

impl fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySession")
            .field("has_token", &self.token().is_some())
            .field("has_notifier", &self.on_auth_required.is_some())
            .finish()
    }
}

/// The `user` entry of the discovery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Server-side user id, 0 when anonymous.
    #[serde(default)]
    pub id: i64,

    /// Username, if logged in.
    #[serde(default)]
    pub username: Option<String>,

    /// Whether the token attached to the discovery request was accepted.
    #[serde(default)]
    pub authenticated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_normalize_token() {
        assert_eq!(normalize_token(None), None);
        assert_eq!(normalize_token(Some(String::new())), None);
        assert_eq!(normalize_token(Some("  \n".into())), None);
        assert_eq!(normalize_token(Some(" abc \n".into())).as_deref(), Some("abc"));
        // Absence is modelled by `None`; a literal "null" is just a token.
        assert_eq!(normalize_token(Some("null".into())).as_deref(), Some("null"));
    }

    #[test]
    fn test_memory_session_shares_token_between_clones() {
        let session = MemorySession::new();
        let other = session.clone();
        assert!(other.token().is_none());

        session.set_token(Some("k1".into()));
        assert_eq!(other.token().as_deref(), Some("k1"));

        session.set_token(Some("".into()));
        assert!(other.token().is_none());
    }

    #[test]
    fn test_memory_session_notifier() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let session = MemorySession::with_token("t").on_auth_required(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.notify_auth_required();
        session.notify_auth_required();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        AnonymousSession.notify_auth_required();
        assert!(AnonymousSession.token().is_none());
    }

    #[test]
    fn test_session_user_defaults() {
        let user: SessionUser = serde_json::from_str(r#"{"id": 0, "username": null}"#).unwrap();
        assert_eq!(user.id, 0);
        assert!(user.username.is_none());
        assert!(!user.authenticated);
    }
}
