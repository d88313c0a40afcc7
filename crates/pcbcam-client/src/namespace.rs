//! Service namespace proxy: the procedures of one namespace.

use std::collections::BTreeMap;
use std::ops::Index;
use std::sync::Arc;

use crate::descriptor::{NamespaceDescriptor, NamespaceMeta};
use crate::error::{ClientError, ClientResult};
use crate::invoker::Procedure;
use crate::session::SessionContext;

/// A named group of procedures, e.g. `ProjectsApi` or `PCBApi`.
#[derive(Debug, Clone)]
pub struct Namespace {
    name: String,
    meta: Option<NamespaceMeta>,
    procedures: BTreeMap<String, Procedure>,
}

impl Namespace {
    /// Build one [`Procedure`] per descriptor entry.
    pub fn build(
        name: impl Into<String>,
        descriptor: NamespaceDescriptor,
        site: &str,
        http: &reqwest::Client,
        session: &Arc<dyn SessionContext>,
    ) -> Self {
        let name = name.into();
        let procedures = descriptor
            .procedures
            .into_iter()
            .map(|(proc_name, meta)| {
                let procedure = Procedure::new(
                    name.clone(),
                    proc_name.clone(),
                    site,
                    meta,
                    http.clone(),
                    Arc::clone(session),
                );
                (proc_name, procedure)
            })
            .collect();

        Self {
            name,
            meta: descriptor.meta,
            procedures,
        }
    }

    /// Namespace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace-level metadata.
    pub fn meta(&self) -> Option<&NamespaceMeta> {
        self.meta.as_ref()
    }

    /// Look up a procedure by name.
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name)
    }

    /// Look up a procedure, failing with [`ClientError::UnknownProcedure`].
    pub fn get(&self, name: &str) -> ClientResult<&Procedure> {
        self.procedure(name)
            .ok_or_else(|| ClientError::unknown_procedure(&self.name, name))
    }

    /// Procedure names in sorted order.
    pub fn procedure_names(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    /// All procedures in name order.
    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procedures.values()
    }

    /// Number of visible procedures.
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Whether the namespace exposes no procedures.
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

impl Index<&str> for Namespace {
    type Output = Procedure;

    /// # Panics
    ///
    /// Panics if the namespace has no such procedure.
    fn index(&self, name: &str) -> &Procedure {
        match self.procedures.get(name) {
            Some(procedure) => procedure,
            None => panic!("no procedure {}.{}", self.name, name),
        }
    }
}
