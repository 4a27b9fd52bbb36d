//! modelgrid-state: embedded object store for ModelGrid.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for service templates, models and node GPU inventory, and the
//! catalog traits the selection and resolution engines consume.
//!
//! # Architecture
//!
//! Objects are JSON-serialized into redb's `&[u8]` value columns. Namespace
//! and cluster scopes live in separate tables; namespaced keys follow
//! `{namespace}/{name}` so a namespace is a prefix scan.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across threads. Model creation is create-if-absent
//! inside a single write transaction and reports `AlreadyExists` distinctly.

pub mod api;
pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use api::{HardwareInventory, ModelCatalog, TemplateCatalog};
pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
