//! Catalog traits consumed by the selection and resolution engines.
//!
//! The engines only ever read through these traits and create models
//! through [`ModelCatalog::create_model`]; any backend that honours the
//! create-if-absent contract can stand in for [`crate::StateStore`].

use std::collections::BTreeSet;

use modelgrid_core::ObjectKey;

use crate::error::StateResult;
use crate::types::{Model, ServiceTemplate};

/// Read access to service templates.
pub trait TemplateCatalog {
    /// Templates in one namespace.
    fn list_templates(&self, namespace: &str) -> StateResult<Vec<ServiceTemplate>>;

    /// Cluster-scoped templates.
    fn list_cluster_templates(&self) -> StateResult<Vec<ServiceTemplate>>;

    /// One template; the key's namespace selects the scope.
    fn get_template(&self, key: &ObjectKey) -> StateResult<Option<ServiceTemplate>>;
}

/// Read and create access to models.
pub trait ModelCatalog {
    /// One model; the key's namespace selects the scope.
    fn get_model(&self, key: &ObjectKey) -> StateResult<Option<Model>>;

    /// Models in one namespace.
    fn list_models(&self, namespace: &str) -> StateResult<Vec<Model>>;

    /// Cluster-scoped models.
    fn list_cluster_models(&self) -> StateResult<Vec<Model>>;

    /// Create `model` if no object with its key exists.
    ///
    /// Must fail with [`crate::StateError::AlreadyExists`] when the key is
    /// taken, and must never overwrite an existing object.
    fn create_model(&self, model: &Model) -> StateResult<()>;
}

/// Source of the GPU models present in the cluster.
pub trait HardwareInventory {
    /// Raw GPU model names; callers normalize before comparing.
    fn available_gpus(&self) -> StateResult<BTreeSet<String>>;
}
