//! PCB CAM RPC client
//!
//! Builds a callable client for a PCB CAM server from the endpoint descriptor
//! it publishes at `<site><prefix>/framework/endpoints`. The descriptor groups
//! procedures into namespaces (`ProjectsApi`, `PCBApi`, ...); the client
//! exposes one [`Namespace`] per group and one [`Procedure`] per entry.
//!
//! ## Architecture
//!
//! - **Descriptor**: fetched once, kept verbatim, parsed per namespace
//! - **Procedure**: one authenticated POST per call, response classified
//!   into a [`CallResult`]
//! - **SessionContext**: the injected credential storage and login prompt
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pcbcam_client::{Client, ClientConfig, MemorySession};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::new("http://localhost:5000");
//!     let session = MemorySession::with_token("my-api-key")
//!         .on_auth_required(|| eprintln!("please log in"));
//!
//!     let client = Client::connect(&config, Arc::new(session)).await?;
//!
//!     match client["ProjectsApi"]["index"].call(json!({"page": 1})).await {
//!         Ok(projects) => println!("{}", projects),
//!         Err(status) => eprintln!("{} {}", status.code(), status.message()),
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod descriptor;
mod error;
mod invoker;
mod namespace;
mod request;
mod session;
mod status;

// Re-export public API
pub use client::{http_client, Client};
pub use config::{ClientConfig, ENDPOINTS_PATH};
pub use descriptor::{
    fetch_descriptor, EndpointDescriptor, NamespaceDescriptor, NamespaceMeta, ProcedureMeta,
};
pub use error::{ClientError, ClientResult};
pub use invoker::{join_url, Procedure};
pub use namespace::Namespace;
pub use request::{CallRequest, FilePart, FormPayload, JSON_CONTENT_TYPE};
pub use session::{
    normalize_token, AnonymousSession, MemorySession, SessionContext, SessionUser, API_KEY_HEADER,
};
pub use status::{classify, CallResult, Status, StatusKind};
