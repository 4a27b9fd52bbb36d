//! ModelGrid model resolution.
//!
//! Maps a workload's model request (a named reference, a container image,
//! or a custom base image plus weight sources) to exactly one model object,
//! creating a namespace-scoped model when none exists.
//!
//! # Components
//!
//! - **Request** (`request`): request kinds, workload context, resolution
//!   results and reason codes.
//! - **Matching** (`matching`): catalog searches by image and by custom
//!   source list.
//! - **Builder** (`builder`): deterministic, labelled models planned for creation.
//! - **Resolver** (`resolver`): sticky reuse, lookup and race-safe create-or-adopt.

pub mod builder;
pub mod error;
pub mod matching;
pub mod request;
pub mod resolver;

pub use builder::{build_custom_model, build_image_model};
pub use error::{ResolveError, ResolveResult};
pub use matching::{
    IdentityDifference, describe_sources, find_matching_custom_model, find_models_with_image,
    identity_difference, same_identity,
};
pub use request::{
    CustomModelSpec, ModelRequest, ModelResolutionReason, Resolution, ResolutionPath,
    WorkloadContext,
};
pub use resolver::{ModelResolver, StaleTrigger, StickyState};
