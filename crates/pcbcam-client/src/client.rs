//! Client root: every namespace generated from the endpoint descriptor.

use std::collections::BTreeMap;
use std::ops::Index;
use std::sync::Arc;

use tracing::info;

use crate::config::ClientConfig;
use crate::descriptor::{fetch_descriptor, EndpointDescriptor};
use crate::error::{ClientError, ClientResult};
use crate::invoker::Procedure;
use crate::namespace::Namespace;
use crate::session::{SessionContext, SessionUser};

/// The object the rest of an application performs every remote call through.
///
/// Built once from the descriptor and immutable afterwards. Lookups are by
/// name: `client["ProjectsApi"]["index"].call(args)`.
#[derive(Debug, Clone)]
pub struct Client {
    site: String,
    namespaces: BTreeMap<String, Namespace>,
    user: Option<SessionUser>,
    descriptor: EndpointDescriptor,
}

impl Client {
    /// Fetch the descriptor and build the client.
    pub async fn connect(
        config: &ClientConfig,
        session: Arc<dyn SessionContext>,
    ) -> ClientResult<Self> {
        let http = http_client()?;
        Self::connect_with(http, config, session).await
    }

    /// Like [`Client::connect`] with a caller-supplied HTTP client.
    pub async fn connect_with(
        http: reqwest::Client,
        config: &ClientConfig,
        session: Arc<dyn SessionContext>,
    ) -> ClientResult<Self> {
        let descriptor = fetch_descriptor(&http, config, session.as_ref()).await?;
        Self::from_descriptor(descriptor, config, http, session)
    }

    /// Build the client from an already fetched descriptor.
    ///
    /// Entries starting with `_` and the configured exclusions are skipped.
    /// Fails only when a kept namespace has the wrong shape.
    pub fn from_descriptor(
        descriptor: EndpointDescriptor,
        config: &ClientConfig,
        http: reqwest::Client,
        session: Arc<dyn SessionContext>,
    ) -> ClientResult<Self> {
        let mut namespaces = BTreeMap::new();
        for name in descriptor.namespace_names(config) {
            let parsed = descriptor.namespace(name)?;
            let namespace = Namespace::build(name, parsed, &config.site, &http, &session);
            namespaces.insert(name.to_string(), namespace);
        }

        let user = descriptor.session_user();
        info!(
            site = %config.site,
            namespaces = namespaces.len(),
            procedures = namespaces.values().map(Namespace::len).sum::<usize>(),
            "Built client from endpoint descriptor"
        );

        Ok(Self {
            site: config.site.clone(),
            namespaces,
            user,
            descriptor,
        })
    }

    /// Site the procedure URLs are built from.
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Look up a namespace by name.
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// Look up a namespace, failing with [`ClientError::UnknownNamespace`].
    pub fn get(&self, name: &str) -> ClientResult<&Namespace> {
        self.namespace(name)
            .ok_or_else(|| ClientError::UnknownNamespace(name.to_string()))
    }

    /// Look up a procedure by namespace and name.
    pub fn procedure(&self, namespace: &str, name: &str) -> ClientResult<&Procedure> {
        self.get(namespace)?.get(name)
    }

    /// Generated namespace names in sorted order.
    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// All namespaces in name order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// Namespace name to visible procedure names.
    pub fn list_endpoints(&self) -> BTreeMap<String, Vec<String>> {
        self.namespaces
            .iter()
            .map(|(name, ns)| {
                let procedures = ns.procedure_names().map(str::to_string).collect();
                (name.clone(), procedures)
            })
            .collect()
    }

    /// The session user reported by the discovery endpoint.
    pub fn session_user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// The descriptor this client was built from.
    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }
}

impl Index<&str> for Client {
    type Output = Namespace;

    /// # Panics
    ///
    /// Panics if no namespace with this name was generated.
    fn index(&self, name: &str) -> &Namespace {
        match self.namespaces.get(name) {
            Some(namespace) => namespace,
            None => panic!("no namespace {}", name),
        }
    }
}

/// The HTTP client used by [`Client::connect`].
pub fn http_client() -> ClientResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("pcbcam/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
