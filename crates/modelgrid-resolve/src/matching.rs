//! Searching the catalog for models that already serve a request.

use modelgrid_core::ModelSource;
use modelgrid_state::{Model, ModelCatalog};

use crate::error::ResolveResult;
use crate::request::CustomModelSpec;

/// Models in `namespace` and cluster scope whose image equals `image`.
///
/// Namespace matches come first, each scope in store order.
pub fn find_models_with_image<S>(store: &S, namespace: &str, image: &str) -> ResolveResult<Vec<Model>>
where
    S: ModelCatalog + ?Sized,
{
    let wanted = image.trim();
    let mut matches: Vec<Model> = store
        .list_models(namespace)?
        .into_iter()
        .filter(|m| m.spec.image.trim() == wanted)
        .collect();
    matches.extend(
        store
            .list_cluster_models()?
            .into_iter()
            .filter(|m| m.spec.image.trim() == wanted),
    );
    Ok(matches)
}

/// First namespace model built from the same base image and sources.
pub fn find_matching_custom_model<S>(
    store: &S,
    namespace: &str,
    spec: &CustomModelSpec,
) -> ResolveResult<Option<Model>>
where
    S: ModelCatalog + ?Sized,
{
    let base = spec.base_image.trim();
    Ok(store.list_models(namespace)?.into_iter().find(|m| {
        m.spec.image.trim() == base && sources_match(&m.spec.model_sources, &spec.model_sources)
    }))
}

/// Pairwise origin match, in order.
pub fn sources_match(existing: &[ModelSource], wanted: &[ModelSource]) -> bool {
    existing.len() == wanted.len()
        && existing.iter().zip(wanted).all(|(a, b)| a.same_origin(b))
}

/// Whether an object found under a planned name serves the same model.
pub fn same_identity(existing: &Model, planned: &Model) -> bool {
    identity_difference(existing, planned).is_none()
}

/// First identity dimension on which two models differ, with both sides rendered.
pub fn identity_difference(existing: &Model, planned: &Model) -> Option<IdentityDifference> {
    if existing.spec.image.trim() != planned.spec.image.trim() {
        return Some(IdentityDifference {
            dimension: "image",
            existing: existing.spec.image.trim().to_string(),
            requested: planned.spec.image.trim().to_string(),
        });
    }
    if !sources_match(&existing.spec.model_sources, &planned.spec.model_sources) {
        return Some(IdentityDifference {
            dimension: "model sources",
            existing: describe_sources(&existing.spec.model_sources),
            requested: describe_sources(&planned.spec.model_sources),
        });
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDifference {
    pub dimension: &'static str,
    pub existing: String,
    pub requested: String,
}

/// `id=uri` per source, with `@endpoint` when one is set.
pub fn describe_sources(sources: &[ModelSource]) -> String {
    sources
        .iter()
        .map(|s| match s.endpoint() {
            "" => format!("{}={}", s.model_id, s.source_uri),
            endpoint => format!("{}={}@{endpoint}", s.model_id, s.source_uri),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
