//! Error types for template selection.

use modelgrid_core::NameError;
use modelgrid_state::StateError;
use thiserror::Error;

pub type SelectResult<T> = Result<T, SelectError>;

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("selected template {0} disappeared before it could be fetched")]
    Vanished(String),

    #[error("template {name:?} not found in namespace {namespace} or cluster scope")]
    TemplateNotFound { name: String, namespace: String },

    #[error("invalid derived template name: {0}")]
    Naming(#[from] NameError),
}

impl SelectError {
    /// Missing upstream dependency: retrying with the same inputs cannot help.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, SelectError::TemplateNotFound { .. })
    }
}
