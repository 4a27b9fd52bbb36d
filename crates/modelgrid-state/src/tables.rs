//! redb table definitions for the ModelGrid object store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized objects).
//! Namespaced keys follow `{namespace}/{name}`; cluster keys are `{name}`.

use redb::TableDefinition;

/// Every table maps a string key to a JSON document.
pub type ObjectTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Namespace-scoped service templates keyed by `{namespace}/{name}`.
pub const TEMPLATES: ObjectTable = TableDefinition::new("templates");

/// Cluster-scoped service templates keyed by `{name}`.
pub const CLUSTER_TEMPLATES: ObjectTable = TableDefinition::new("cluster_templates");

/// Namespace-scoped models keyed by `{namespace}/{name}`.
pub const MODELS: ObjectTable = TableDefinition::new("models");

/// Cluster-scoped models keyed by `{name}`.
pub const CLUSTER_MODELS: ObjectTable = TableDefinition::new("cluster_models");

/// Node GPU inventory keyed by `{node_name}`.
pub const NODES: ObjectTable = TableDefinition::new("nodes");
