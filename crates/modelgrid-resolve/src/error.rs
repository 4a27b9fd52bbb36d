//! Model resolution error types.

use modelgrid_core::NameError;
use modelgrid_state::StateError;
use thiserror::Error;

use crate::request::ModelResolutionReason;

/// Errors that can occur while resolving a workload's model.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("model {name:?} not found in namespace {namespace} or cluster scope")]
    ModelNotFound { name: String, namespace: String },

    #[error("multiple models found for image {image}: {}", matches.join(", "))]
    MultipleModels { image: String, matches: Vec<String> },

    #[error("invalid image reference {image:?}: {source}")]
    InvalidImage { image: String, source: NameError },

    #[error("invalid model spec: {0}")]
    InvalidSpec(String),

    #[error("model {name} already exists with different {dimension} (existing {existing:?}, requested {requested:?})")]
    NameConflict {
        name: String,
        /// Which part of the identity differs: `image` or `model sources`.
        dimension: &'static str,
        existing: String,
        requested: String,
    },

    #[error("model {0} disappeared after a create conflict")]
    Vanished(String),
}

impl ResolveError {
    /// Terminal errors cannot succeed until the request itself changes.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResolveError::State(_) | ResolveError::Vanished(_))
    }

    pub fn reason(&self) -> Option<ModelResolutionReason> {
        match self {
            ResolveError::State(_) | ResolveError::Vanished(_) => None,
            ResolveError::ModelNotFound { .. } => Some(ModelResolutionReason::ModelNotFound),
            ResolveError::MultipleModels { .. } => Some(ModelResolutionReason::MultipleModelsFound),
            ResolveError::InvalidImage { .. } => Some(ModelResolutionReason::InvalidImageReference),
            ResolveError::InvalidSpec(_) => Some(ModelResolutionReason::InvalidModelSpec),
            ResolveError::NameConflict { .. } => Some(ModelResolutionReason::ModelNameConflict),
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
