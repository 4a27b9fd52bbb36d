//! Stored object types for the ModelGrid object store.

use std::collections::BTreeMap;

use modelgrid_core::{
    GpuSelector, ModelSource, ObjectKey, ResourceStatus, Scope, TemplateProfile,
};
use serde::{Deserialize, Serialize};

/// Label recording how a model came to exist.
pub const ORIGIN_LABEL: &str = "modelgrid.io/origin";
/// Value of [`ORIGIN_LABEL`] for models created by the resolver.
pub const ORIGIN_AUTO_GENERATED: &str = "auto-generated";
/// Label marking a model built from a custom base image and sources.
pub const CUSTOM_MODEL_LABEL: &str = "modelgrid.io/custom-model";
/// Annotation naming the workload a model was created for. Not an owner link.
pub const CREATED_FOR_ANNOTATION: &str = "modelgrid.io/created-for";

/// Declared fields of a service template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
    /// Model identity this template serves.
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_selector: Option<GpuSelector>,
}

/// A deployment template for one model on one hardware configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTemplate {
    pub name: String,
    /// `None` for cluster-scoped templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub spec: TemplateSpec,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<TemplateProfile>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ServiceTemplate {
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.key().scope()
    }
}

/// Declared fields of a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    /// Container image serving the model.
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub model_sources: Vec<ModelSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_config_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// A model resource, namespace- or cluster-scoped.
///
/// Models carry no owner: their lifetime is independent of any workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub spec: ModelSpec,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Model {
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.key().scope()
    }

    pub fn is_auto_generated(&self) -> bool {
        self.labels.get(ORIGIN_LABEL).map(String::as_str) == Some(ORIGIN_AUTO_GENERATED)
    }
}

/// GPU inventory reported by one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub name: String,
    #[serde(default)]
    pub gpu_models: Vec<String>,
}

/// Bulk fixture format for seeding a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshot {
    pub templates: Vec<ServiceTemplate>,
    pub models: Vec<Model>,
    pub nodes: Vec<NodeInfo>,
}
