//! modelgrid-core: shared vocabulary for the ModelGrid engine.
//!
//! # Components
//!
//! - **types**: scopes, readiness, profiles, overrides and model references
//! - **naming**: deterministic, RFC 1123 compliant derived names
//! - **image**: container image reference parsing
//! - **gpu**: GPU model normalization for inventory comparisons
//! - **config**: `modelgrid.toml` parsing

pub mod config;
pub mod gpu;
pub mod image;
pub mod naming;
pub mod types;

pub use config::EngineConfig;
pub use image::{ImageError, ImageParts};
pub use naming::{NameError, NameLimits};
pub use types::*;
