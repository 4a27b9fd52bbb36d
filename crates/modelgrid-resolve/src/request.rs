//! Resolution inputs and results.

use std::collections::BTreeMap;

use modelgrid_core::naming::compute_hash;
use modelgrid_core::{ModelReference, ModelSource};
use modelgrid_state::Model;
use serde::{Deserialize, Serialize};

/// Model built from a base image plus explicit weight sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomModelSpec {
    pub base_image: String,
    #[serde(default)]
    pub model_sources: Vec<ModelSource>,
}

/// How a workload names its model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelRequest {
    /// An existing model by name.
    Ref { name: String },
    /// Whatever model serves this container image.
    Image { image: String },
    /// A model assembled from a base image and sources.
    Custom(CustomModelSpec),
}

impl ModelRequest {
    /// Stable digest of the request inputs.
    ///
    /// Callers store it next to a terminal failure and skip retries until it
    /// changes.
    pub fn fingerprint(&self) -> String {
        let inputs: Vec<String> = match self {
            ModelRequest::Ref { name } => vec!["ref".into(), name.clone()],
            ModelRequest::Image { image } => vec!["image".into(), image.trim().to_string()],
            ModelRequest::Custom(spec) => {
                let mut inputs = vec!["custom".to_string(), spec.base_image.clone()];
                for source in &spec.model_sources {
                    inputs.push(source.model_id.clone());
                    inputs.push(source.source_uri.clone());
                    inputs.push(source.endpoint().to_string());
                }
                inputs
            }
        };
        compute_hash(&inputs)
    }
}

/// The workload a model is resolved for, and the settings a created model inherits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadContext {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_config_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl WorkloadContext {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Route that produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionPath {
    /// The previous reference is still valid.
    Sticky,
    ByRef,
    ByImage,
    ByCustomSpec,
    /// This call created the model.
    Created,
    /// Another writer created the model first; it was adopted.
    Adopted,
}

/// Reason codes surfaced to the caller's status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelResolutionReason {
    ModelResolved,
    ModelNotReady,
    CreatingModel,
    ModelNotFound,
    MultipleModelsFound,
    InvalidImageReference,
    InvalidModelSpec,
    ModelNameConflict,
}

/// A resolved model and how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub reference: ModelReference,
    pub model: Model,
    pub path: ResolutionPath,
}

impl Resolution {
    pub fn new(model: Model, path: ResolutionPath) -> Self {
        Self {
            reference: ModelReference::new(&model.key()),
            model,
            path,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model.status.is_ready()
    }

    pub fn reason(&self) -> ModelResolutionReason {
        match (self.is_ready(), self.path) {
            (true, _) => ModelResolutionReason::ModelResolved,
            (false, ResolutionPath::Created | ResolutionPath::Adopted) => {
                ModelResolutionReason::CreatingModel
            }
            (false, _) => ModelResolutionReason::ModelNotReady,
        }
    }
}
