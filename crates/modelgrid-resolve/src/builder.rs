//! Planned models for creation.

use std::collections::BTreeMap;

use modelgrid_core::naming::{custom_model_name, model_name_for_image};
use modelgrid_core::{ModelSource, NameLimits, ResourceStatus};
use modelgrid_state::{
    CREATED_FOR_ANNOTATION, CUSTOM_MODEL_LABEL, Model, ModelSpec, ORIGIN_AUTO_GENERATED,
    ORIGIN_LABEL,
};

use crate::error::{ResolveError, ResolveResult};
use crate::request::{CustomModelSpec, WorkloadContext};

/// Model serving `image`, named after the image, in the workload namespace.
pub fn build_image_model(
    image: &str,
    workload: &WorkloadContext,
    limits: NameLimits,
) -> ResolveResult<Model> {
    let image = image.trim();
    let name = model_name_for_image(image, limits).map_err(|source| ResolveError::InvalidImage {
        image: image.to_string(),
        source,
    })?;
    Ok(planned_model(name, image, Vec::new(), workload, false))
}

/// Model built from a custom base image and sources, in the workload namespace.
pub fn build_custom_model(
    spec: &CustomModelSpec,
    workload: &WorkloadContext,
    limits: NameLimits,
) -> ResolveResult<Model> {
    let base = spec.base_image.trim();
    let name = custom_model_name(base, &spec.model_sources, limits)
        .map_err(|e| ResolveError::InvalidSpec(e.to_string()))?;
    Ok(planned_model(name, base, spec.model_sources.clone(), workload, true))
}

fn planned_model(
    name: String,
    image: &str,
    model_sources: Vec<ModelSource>,
    workload: &WorkloadContext,
    custom: bool,
) -> Model {
    let mut labels = BTreeMap::new();
    labels.insert(ORIGIN_LABEL.to_string(), ORIGIN_AUTO_GENERATED.to_string());
    if custom {
        labels.insert(CUSTOM_MODEL_LABEL.to_string(), "true".to_string());
    }
    let mut annotations = BTreeMap::new();
    annotations.insert(
        CREATED_FOR_ANNOTATION.to_string(),
        format!("{}/{}", workload.namespace, workload.name),
    );

    Model {
        name,
        namespace: Some(workload.namespace.clone()),
        spec: ModelSpec {
            image: image.to_string(),
            model_sources,
            runtime_config_name: workload.runtime_config_name.clone(),
            service_account_name: workload.service_account_name.clone(),
            image_pull_secrets: workload.image_pull_secrets.clone(),
            env: workload.env.clone(),
        },
        status: ResourceStatus::Pending,
        labels,
        annotations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workload() -> WorkloadContext {
        WorkloadContext {
            runtime_config_name: Some("vllm-rocm".into()),
            service_account_name: Some("inference".into()),
            image_pull_secrets: vec!["regcred".into()],
            ..WorkloadContext::new("team-a", "chat")
        }
    }

    #[test]
    fn image_model_inherits_workload_settings() {
        let model = build_image_model(" ghcr.io/org/llama:v1 ", &workload(), NameLimits::default()).unwrap();
        assert!(model.name.starts_with("llama-v1-"));
        assert_eq!(model.namespace.as_deref(), Some("team-a"));
        assert_eq!(model.spec.image, "ghcr.io/org/llama:v1");
        assert_eq!(model.spec.runtime_config_name.as_deref(), Some("vllm-rocm"));
        assert_eq!(model.spec.service_account_name.as_deref(), Some("inference"));
        assert_eq!(model.spec.image_pull_secrets, vec!["regcred"]);
        assert_eq!(model.status, ResourceStatus::Pending);
        assert!(model.is_auto_generated());
        assert!(!model.labels.contains_key(CUSTOM_MODEL_LABEL));
        assert_eq!(model.annotations[CREATED_FOR_ANNOTATION], "team-a/chat");
    }

    #[test]
    fn invalid_image_is_reported_as_such() {
        let err = build_image_model("ghcr.io/org/llama:", &workload(), NameLimits::default()).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidImage { .. }));
        assert!(err.is_terminal());
    }

    #[test]
    fn custom_model_is_labelled_and_named_from_first_source() {
        let spec = CustomModelSpec {
            base_image: "base:v1".into(),
            model_sources: vec![ModelSource {
                model_id: "Llama-3-8B".into(),
                source_uri: "s3://bucket/llama".into(),
                env: Default::default(),
            }],
        };
        let model = build_custom_model(&spec, &workload(), NameLimits::default()).unwrap();
        assert!(model.name.starts_with("llama-3-8b-"));
        assert_eq!(model.labels[CUSTOM_MODEL_LABEL], "true");
        assert_eq!(model.spec.model_sources, spec.model_sources);
    }
}
