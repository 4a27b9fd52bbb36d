//! StateStore: redb-backed object persistence for ModelGrid.
//!
//! Provides typed access to service templates, models and node inventory.
//! All values are JSON-serialized into redb's `&[u8]` value columns. The
//! store supports both on-disk and in-memory backends (the latter for
//! testing).

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use modelgrid_core::ObjectKey;
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{HardwareInventory, ModelCatalog, TemplateCatalog};
use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe object store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "object store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory object store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        for table in [TEMPLATES, CLUSTER_TEMPLATES, MODELS, CLUSTER_MODELS, NODES] {
            txn.open_table(table).map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic document access ────────────────────────────────────

    fn put_json<T: Serialize>(&self, table: ObjectTable, key: &str, value: &T) -> StateResult<()> {
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, table: ObjectTable, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// All documents whose key starts with `prefix`, in key order.
    fn list_json<T: DeserializeOwned>(&self, table: ObjectTable, prefix: &str) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(prefix) {
                let item: T =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(item);
            }
        }
        Ok(results)
    }

    fn delete_key(&self, table: ObjectTable, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    fn template_table(key: &ObjectKey) -> ObjectTable {
        match key.namespace {
            Some(_) => TEMPLATES,
            None => CLUSTER_TEMPLATES,
        }
    }

    fn model_table(key: &ObjectKey) -> ObjectTable {
        match key.namespace {
            Some(_) => MODELS,
            None => CLUSTER_MODELS,
        }
    }

    // ── Templates ──────────────────────────────────────────────────

    /// Insert or update a template in its scope.
    pub fn put_template(&self, template: &ServiceTemplate) -> StateResult<()> {
        let key = template.key();
        self.put_json(Self::template_table(&key), &key.table_key(), template)?;
        debug!(%key, "template stored");
        Ok(())
    }

    /// Delete a template. Returns true if it existed.
    pub fn delete_template(&self, key: &ObjectKey) -> StateResult<bool> {
        let existed = self.delete_key(Self::template_table(key), &key.table_key())?;
        debug!(%key, existed, "template deleted");
        Ok(existed)
    }

    // ── Models ─────────────────────────────────────────────────────

    /// Insert or update a model in its scope.
    pub fn put_model(&self, model: &Model) -> StateResult<()> {
        let key = model.key();
        self.put_json(Self::model_table(&key), &key.table_key(), model)?;
        debug!(%key, "model stored");
        Ok(())
    }

    /// Delete a model. Returns true if it existed.
    pub fn delete_model(&self, key: &ObjectKey) -> StateResult<bool> {
        let existed = self.delete_key(Self::model_table(key), &key.table_key())?;
        debug!(%key, existed, "model deleted");
        Ok(existed)
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Insert or update a node's GPU inventory.
    pub fn put_node(&self, node: &NodeInfo) -> StateResult<()> {
        self.put_json(NODES, &node.name, node)
    }

    /// List all nodes.
    pub fn list_nodes(&self) -> StateResult<Vec<NodeInfo>> {
        self.list_json(NODES, "")
    }

    /// Delete a node. Returns true if it existed.
    pub fn delete_node(&self, name: &str) -> StateResult<bool> {
        self.delete_key(NODES, name)
    }

    // ── Bulk ───────────────────────────────────────────────────────

    /// Upsert every object in `snapshot`. Returns the number written.
    pub fn load_snapshot(&self, snapshot: &Snapshot) -> StateResult<usize> {
        for template in &snapshot.templates {
            self.put_template(template)?;
        }
        for model in &snapshot.models {
            self.put_model(model)?;
        }
        for node in &snapshot.nodes {
            self.put_node(node)?;
        }
        Ok(snapshot.templates.len() + snapshot.models.len() + snapshot.nodes.len())
    }
}

impl TemplateCatalog for StateStore {
    fn list_templates(&self, namespace: &str) -> StateResult<Vec<ServiceTemplate>> {
        self.list_json(TEMPLATES, &format!("{namespace}/"))
    }

    fn list_cluster_templates(&self) -> StateResult<Vec<ServiceTemplate>> {
        self.list_json(CLUSTER_TEMPLATES, "")
    }

    fn get_template(&self, key: &ObjectKey) -> StateResult<Option<ServiceTemplate>> {
        self.get_json(Self::template_table(key), &key.table_key())
    }
}

impl ModelCatalog for StateStore {
    fn get_model(&self, key: &ObjectKey) -> StateResult<Option<Model>> {
        self.get_json(Self::model_table(key), &key.table_key())
    }

    fn list_models(&self, namespace: &str) -> StateResult<Vec<Model>> {
        self.list_json(MODELS, &format!("{namespace}/"))
    }

    fn list_cluster_models(&self) -> StateResult<Vec<Model>> {
        self.list_json(CLUSTER_MODELS, "")
    }

    fn create_model(&self, model: &Model) -> StateResult<()> {
        let key = model.key();
        let table_key = key.table_key();
        let value = serde_json::to_vec(model).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let created = {
            let mut table = txn
                .open_table(Self::model_table(&key))
                .map_err(map_err!(Table))?;
            let exists = table
                .get(table_key.as_str())
                .map_err(map_err!(Read))?
                .is_some();
            if !exists {
                table
                    .insert(table_key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
            !exists
        };
        if !created {
            txn.abort().map_err(map_err!(Transaction))?;
            debug!(%key, "model create skipped, key taken");
            return Err(StateError::AlreadyExists(key.to_string()));
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "model created");
        Ok(())
    }
}

impl HardwareInventory for StateStore {
    fn available_gpus(&self) -> StateResult<BTreeSet<String>> {
        Ok(self
            .list_nodes()?
            .into_iter()
            .flat_map(|node| node.gpu_models)
            .filter(|m| !m.trim().is_empty())
            .collect())
    }
}
