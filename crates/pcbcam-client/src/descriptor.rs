//! Endpoint descriptor: the server-supplied map of namespaces and procedures.
//!
//! The discovery endpoint answers with a JSON object shaped like
//!
//! ```text
//! {
//!   "ProjectsApi": {
//!     "__data": { "url": "projects" },
//!     "index":  { "simple_url": "api/projects/index", "args": [], ... }
//!   },
//!   "user": { "id": 0, "username": null, "authenticated": false }
//! }
//! ```
//!
//! The payload is kept verbatim. Namespaces are parsed into typed
//! [`NamespaceDescriptor`]s on demand, which is where shape errors surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::{normalize_token, SessionContext, SessionUser, API_KEY_HEADER};

/// Key of the namespace-level metadata entry.
const NAMESPACE_META_KEY: &str = "__data";

/// Key of the session user entry in the top-level payload.
const USER_KEY: &str = "user";

/// The raw discovery payload, keyed by top-level entry name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointDescriptor {
    entries: Map<String, Value>,
}

impl EndpointDescriptor {
    /// Wrap a decoded discovery payload. The payload must be a JSON object.
    pub fn from_value(value: Value) -> ClientResult<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(ClientError::malformed(
                "<root>",
                format!("expected an object, got {}", json_kind(&other)),
            )),
        }
    }

    /// Parse a descriptor from a JSON string.
    pub fn from_json(s: &str) -> ClientResult<Self> {
        Self::from_value(serde_json::from_str(s)?)
    }

    /// All top-level entries, including filtered ones.
    pub fn entries(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// Consume the descriptor and return the verbatim payload.
    pub fn into_value(self) -> Value {
        Value::Object(self.entries)
    }

    /// Top-level entries that survive the namespace filter.
    pub fn namespace_names<'a>(&'a self, config: &'a ClientConfig) -> impl Iterator<Item = &'a str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(move |name| config.includes_namespace(name))
    }

    /// Parse one namespace entry.
    pub fn namespace(&self, name: &str) -> ClientResult<NamespaceDescriptor> {
        let value = self
            .entries
            .get(name)
            .ok_or_else(|| ClientError::UnknownNamespace(name.to_string()))?;
        NamespaceDescriptor::parse(name, value)
    }

    /// The session user reported alongside the namespaces, if any.
    pub fn session_user(&self) -> Option<SessionUser> {
        let value = self.entries.get(USER_KEY)?;
        match serde_json::from_value(value.clone()) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Ignoring unparseable user entry in endpoint descriptor");
                None
            }
        }
    }
}

/// Metadata attached to a namespace via its `__data` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceMeta {
    /// URL root the namespace is mounted under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Anything else the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metadata for a single procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureMeta {
    /// URL fragment appended to the site to form the call URL.
    pub simple_url: String,

    /// Name of the server-side app class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    /// Name of the server-side function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    /// Canonical (non-simplified) URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret_url: Option<String>,

    /// Positional argument names.
    #[serde(default)]
    pub args: Vec<String>,

    /// Keyword arguments with their defaults.
    #[serde(default)]
    pub kwargs: Vec<(String, Value)>,

    /// Per-procedure server config (`require_login`, `file_keys`, ...).
    #[serde(default)]
    pub config: Map<String, Value>,

    /// Unrecognized keys, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProcedureMeta {
    /// Metadata with only a URL fragment.
    pub fn new(simple_url: impl Into<String>) -> Self {
        Self {
            simple_url: simple_url.into(),
            app: None,
            function: None,
            ret_url: None,
            args: Vec::new(),
            kwargs: Vec::new(),
            config: Map::new(),
            extra: Map::new(),
        }
    }

    /// Whether the server marked this procedure as requiring a login.
    pub fn requires_login(&self) -> bool {
        match self.config.get("require_login") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }

    /// Names of the form fields the server expects file uploads on.
    pub fn file_keys(&self) -> Vec<String> {
        self.config
            .get("file_keys")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All accepted parameter names, keyword arguments first.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.kwargs
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

/// A parsed namespace entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceDescriptor {
    /// Namespace-level metadata, if the server sent any.
    pub meta: Option<NamespaceMeta>,

    /// Visible procedures by name.
    pub procedures: BTreeMap<String, ProcedureMeta>,
}

impl NamespaceDescriptor {
    /// Parse a namespace entry. Procedure names starting with `_` are skipped.
    pub fn parse(name: &str, value: &Value) -> ClientResult<Self> {
        let entries = value.as_object().ok_or_else(|| {
            ClientError::malformed(name, format!("expected an object, got {}", json_kind(value)))
        })?;

        let mut namespace = Self::default();
        for (key, entry) in entries {
            if key == NAMESPACE_META_KEY {
                let meta = serde_json::from_value(entry.clone())
                    .map_err(|e| ClientError::malformed(format!("{}.{}", name, key), e.to_string()))?;
                namespace.meta = Some(meta);
                continue;
            }
            if key.starts_with('_') {
                debug!(namespace = %name, procedure = %key, "Skipping hidden procedure");
                continue;
            }

            let meta: ProcedureMeta = serde_json::from_value(entry.clone())
                .map_err(|e| ClientError::malformed(format!("{}.{}", name, key), e.to_string()))?;
            namespace.procedures.insert(key.clone(), meta);
        }

        Ok(namespace)
    }
}

/// Fetch the endpoint descriptor from `<site><prefix>/framework/endpoints`.
///
/// The token is attached when the session has one. Errors propagate; there is
/// no local recovery.
pub async fn fetch_descriptor(
    http: &reqwest::Client,
    config: &ClientConfig,
    session: &dyn SessionContext,
) -> ClientResult<EndpointDescriptor> {
    let url = config.endpoints_url();

    let mut request = http.get(&url);
    if let Some(token) = normalize_token(session.token()) {
        request = request.header(API_KEY_HEADER, token);
    }

    debug!(url = %url, "Fetching endpoint descriptor");
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Discovery {
            url,
            status: status.as_u16(),
        });
    }

    let value: Value = response.json().await?;
    let descriptor = EndpointDescriptor::from_value(value)?;
    info!(
        url = %url,
        entries = descriptor.entries().len(),
        "Fetched endpoint descriptor"
    );
    Ok(descriptor)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
