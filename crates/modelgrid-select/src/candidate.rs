//! Candidate snapshots and catalog gathering.
//!
//! Bridges `modelgrid_state::ServiceTemplate` to the selection engine's
//! [`TemplateCandidate`], resolving each ranking dimension from the
//! discovered profile first and the declared spec second.

use modelgrid_core::{GpuSelector, ObjectKey, ProfileType, ResourceStatus, Scope, TemplateProfile};
use modelgrid_state::{ServiceTemplate, StateResult, TemplateCatalog};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Point-in-time view of one template considered for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCandidate {
    pub key: ObjectKey,
    pub model_name: String,
    pub status: ResourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_selector: Option<GpuSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<TemplateProfile>,
}

fn non_blank(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

impl TemplateCandidate {
    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn scope(&self) -> Scope {
        self.key.scope()
    }

    pub fn profile_type(&self) -> Option<ProfileType> {
        self.profile.as_ref().and_then(|p| p.profile_type)
    }

    /// Missing profile information counts as unoptimized.
    pub fn is_optimized(&self) -> bool {
        self.profile_type() == Some(ProfileType::Optimized)
    }

    pub fn effective_metric(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| non_blank(&p.metric))
            .or_else(|| self.metric.as_deref().and_then(non_blank))
    }

    pub fn effective_precision(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| non_blank(&p.precision))
            .or_else(|| self.precision.as_deref().and_then(non_blank))
    }

    pub fn effective_gpu_model(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| non_blank(&p.gpu))
            .or_else(|| self.gpu_selector.as_ref().and_then(|g| non_blank(&g.model)))
    }

    /// Zero when neither profile nor spec states a count.
    pub fn effective_gpu_count(&self) -> u32 {
        self.profile
            .as_ref()
            .map(|p| p.gpu_count)
            .filter(|&c| c > 0)
            .or_else(|| self.gpu_selector.as_ref().map(|g| g.count))
            .unwrap_or(0)
    }
}

impl From<&ServiceTemplate> for TemplateCandidate {
    fn from(template: &ServiceTemplate) -> Self {
        TemplateCandidate {
            key: template.key(),
            model_name: template.spec.model_name.clone(),
            status: template.status,
            metric: template.spec.metric.clone(),
            precision: template.spec.precision.clone(),
            gpu_selector: template.spec.gpu_selector.clone(),
            profile: template.profile.clone(),
        }
    }
}

/// Templates serving `model_name`: namespace scope first, then cluster scope.
pub fn gather_candidates<C: TemplateCatalog + ?Sized>(
    catalog: &C,
    namespace: &str,
    model_name: &str,
) -> StateResult<Vec<TemplateCandidate>> {
    let mut candidates: Vec<TemplateCandidate> = catalog
        .list_templates(namespace)?
        .iter()
        .filter(|t| t.spec.model_name == model_name)
        .map(TemplateCandidate::from)
        .collect();
    let namespaced = candidates.len();
    candidates.extend(
        catalog
            .list_cluster_templates()?
            .iter()
            .filter(|t| t.spec.model_name == model_name)
            .map(TemplateCandidate::from),
    );
    debug!(
        %namespace,
        model = model_name,
        namespaced,
        cluster = candidates.len() - namespaced,
        "gathered template candidates"
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgrid_state::{StateStore, TemplateSpec};

    fn sample_template(namespace: Option<&str>, name: &str, model: &str) -> ServiceTemplate {
        ServiceTemplate {
            name: name.to_string(),
            namespace: namespace.map(String::from),
            spec: TemplateSpec {
                model_name: model.to_string(),
                metric: Some("throughput".into()),
                precision: Some("fp16".into()),
                gpu_selector: Some(GpuSelector {
                    model: "MI300X".into(),
                    count: 2,
                }),
            },
            status: ResourceStatus::Ready,
            profile: None,
            labels: Default::default(),
        }
    }

    #[test]
    fn spec_fields_are_fallback() {
        let c = TemplateCandidate::from(&sample_template(None, "t", "m"));
        assert_eq!(c.effective_metric(), Some("throughput"));
        assert_eq!(c.effective_precision(), Some("fp16"));
        assert_eq!(c.effective_gpu_model(), Some("MI300X"));
        assert_eq!(c.effective_gpu_count(), 2);
        assert!(!c.is_optimized());
        assert_eq!(c.scope(), Scope::Cluster);
    }

    #[test]
    fn profile_wins_over_spec() {
        let mut template = sample_template(Some("ns"), "t", "m");
        template.profile = Some(TemplateProfile {
            profile_type: Some(ProfileType::Optimized),
            gpu: "MI325X".into(),
            gpu_count: 8,
            metric: "latency".into(),
            precision: "fp8".into(),
        });
        let c = TemplateCandidate::from(&template);
        assert_eq!(c.effective_metric(), Some("latency"));
        assert_eq!(c.effective_precision(), Some("fp8"));
        assert_eq!(c.effective_gpu_model(), Some("MI325X"));
        assert_eq!(c.effective_gpu_count(), 8);
        assert!(c.is_optimized());
    }

    #[test]
    fn blank_profile_fields_fall_back() {
        let mut template = sample_template(None, "t", "m");
        template.profile = Some(TemplateProfile {
            profile_type: Some(ProfileType::Preview),
            gpu: " ".into(),
            gpu_count: 0,
            metric: String::new(),
            precision: String::new(),
        });
        let c = TemplateCandidate::from(&template);
        assert_eq!(c.effective_gpu_model(), Some("MI300X"));
        assert_eq!(c.effective_gpu_count(), 2);
        assert_eq!(c.effective_metric(), Some("throughput"));
    }

    #[test]
    fn gather_filters_by_model_and_orders_scopes() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_template(&sample_template(None, "c1", "llama")).unwrap();
        store.put_template(&sample_template(Some("ns"), "n1", "llama")).unwrap();
        store.put_template(&sample_template(Some("ns"), "n2", "mistral")).unwrap();
        store.put_template(&sample_template(Some("other"), "o1", "llama")).unwrap();

        let candidates = gather_candidates(&store, "ns", "llama").unwrap();
        let names: Vec<&str> = candidates.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["n1", "c1"]);
    }
}
