//! Shared types used across ModelGrid crates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Visibility scope of a template or model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Visible only inside one namespace.
    Namespace,
    /// Visible to every namespace.
    Cluster,
}

impl Scope {
    pub fn label(&self) -> &'static str {
        match self {
            Scope::Namespace => "namespace",
            Scope::Cluster => "cluster",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Readiness status reported by templates and models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResourceStatus {
    #[default]
    Pending,
    Starting,
    Progressing,
    Ready,
    Running,
    Degraded,
    NotAvailable,
    Failed,
}

impl ResourceStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ResourceStatus::Ready)
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceStatus::Pending => "Pending",
            ResourceStatus::Starting => "Starting",
            ResourceStatus::Progressing => "Progressing",
            ResourceStatus::Ready => "Ready",
            ResourceStatus::Running => "Running",
            ResourceStatus::Degraded => "Degraded",
            ResourceStatus::NotAvailable => "NotAvailable",
            ResourceStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Optimization level discovered for a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileType {
    Optimized,
    Preview,
    Unoptimized,
}

impl ProfileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Optimized => "Optimized",
            ProfileType::Preview => "Preview",
            ProfileType::Unoptimized => "Unoptimized",
        }
    }
}

/// GPU requirement: a model name and a device count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuSelector {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub count: u32,
}

/// Workload-supplied constraints narrowing template selection.
///
/// Absent dimensions are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_selector: Option<GpuSelector>,
}

impl ServiceOverrides {
    /// True when no dimension constrains anything.
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        let gpu_blank = self
            .gpu_selector
            .as_ref()
            .is_none_or(|g| g.model.trim().is_empty() && g.count == 0);
        blank(&self.metric) && blank(&self.precision) && gpu_blank
    }
}

/// Auto-discovered runtime profile of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateProfile {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<ProfileType>,
    #[serde(default)]
    pub gpu: String,
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub precision: String,
}

/// Env var distinguishing otherwise identical S3-compatible sources.
pub const S3_ENDPOINT_ENV: &str = "AWS_ENDPOINT_URL";

/// Where a custom model's weights come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSource {
    pub model_id: String,
    pub source_uri: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ModelSource {
    pub fn endpoint(&self) -> &str {
        self.env.get(S3_ENDPOINT_ENV).map(String::as_str).unwrap_or("")
    }

    /// Two sources denote the same weights when id, URI and endpoint agree.
    pub fn same_origin(&self, other: &ModelSource) -> bool {
        self.model_id == other.model_id
            && self.source_uri == other.source_uri
            && self.endpoint() == other.endpoint()
    }
}

/// Identity of a stored object. Cluster-scoped objects carry no namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn scope(&self) -> Scope {
        match self.namespace {
            Some(_) => Scope::Namespace,
            None => Scope::Cluster,
        }
    }

    /// Storage key: `{namespace}/{name}` or `{name}`.
    pub fn table_key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table_key())
    }
}

/// Kind recorded in a [`ModelReference`].
pub const MODEL_KIND: &str = "Model";
pub const CLUSTER_MODEL_KIND: &str = "ClusterModel";

/// Durable result of model resolution, persisted by the caller between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub scope: Scope,
    pub kind: String,
}

impl ModelReference {
    pub fn new(key: &ObjectKey) -> Self {
        let scope = key.scope();
        let kind = match scope {
            Scope::Namespace => MODEL_KIND,
            Scope::Cluster => CLUSTER_MODEL_KIND,
        };
        Self {
            name: key.name.clone(),
            namespace: key.namespace.clone(),
            scope,
            kind: kind.to_string(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        match (self.scope, &self.namespace) {
            (Scope::Namespace, Some(ns)) => ObjectKey::namespaced(ns, &self.name),
            _ => ObjectKey::cluster(&self.name),
        }
    }
}
