//! Model resolver: maps a workload's model request to one model object.
//!
//! Each call walks a small state machine:
//!
//! ```text
//! Cached ──(ready)──────────────────────────────▶ Sticky
//!   │
//!   └─ Stale(Missing | NotReady | RequestChanged) ─▶ Resolving ─┬─▶ Found (ByRef | ByImage | ByCustomSpec)
//!                                                              └─▶ NeedsCreation ─┬─▶ Created
//!                                                                                 └─▶ Adopted
//! ```
//!
//! Creation is optimistic create-if-absent. A writer that loses the race
//! reads the winner back and adopts it; nothing is locked or retried.

use std::fmt;

use modelgrid_core::{ModelReference, NameLimits, ObjectKey, ResourceStatus};
use modelgrid_state::{Model, ModelCatalog};
use tracing::{debug, info, warn};

use crate::builder::{build_custom_model, build_image_model};
use crate::error::{ResolveError, ResolveResult};
use crate::matching::{
    find_matching_custom_model, find_models_with_image, identity_difference, sources_match,
};
use crate::request::{CustomModelSpec, ModelRequest, Resolution, ResolutionPath, WorkloadContext};

/// Why a previously resolved model can no longer be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleTrigger {
    Missing,
    NotReady(ResourceStatus),
    /// The model no longer serves the current request.
    RequestChanged,
}

impl fmt::Display for StaleTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleTrigger::Missing => f.write_str("missing"),
            StaleTrigger::NotReady(status) => write!(f, "not ready ({status})"),
            StaleTrigger::RequestChanged => f.write_str("request changed"),
        }
    }
}

/// State of the workload's previous model reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StickyState {
    /// Still present, ready and serving the request.
    Cached(Box<Model>),
    Stale(StaleTrigger),
    /// No previous reference.
    Absent,
}

enum Lookup {
    Found(Model, ResolutionPath),
    NeedsCreation(Model),
}

/// Resolves model requests against a [`ModelCatalog`].
pub struct ModelResolver<'s, S: ?Sized> {
    store: &'s S,
    limits: NameLimits,
}

impl<'s, S: ?Sized> ModelResolver<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            limits: NameLimits::default(),
        }
    }

    pub fn with_name_limits(mut self, limits: NameLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl<S: ModelCatalog + ?Sized> ModelResolver<'_, S> {
    /// Resolve `request` for `workload`, reusing `previous` while it is ready.
    pub fn resolve(
        &self,
        request: &ModelRequest,
        workload: &WorkloadContext,
        previous: Option<&ModelReference>,
    ) -> ResolveResult<Resolution> {
        match self.check_sticky(request, previous)? {
            StickyState::Cached(model) => {
                debug!(model = %model.key(), "reusing previous model reference");
                return Ok(Resolution::new(*model, ResolutionPath::Sticky));
            }
            StickyState::Stale(trigger) => {
                debug!(%trigger, workload = %workload.name, "previous model reference is stale");
            }
            StickyState::Absent => {}
        }

        let result = self.lookup(request, workload).and_then(|lookup| match lookup {
            Lookup::Found(model, path) => Ok(Resolution::new(model, path)),
            Lookup::NeedsCreation(planned) => self.create_or_adopt(planned),
        });

        match &result {
            Ok(resolution) => debug!(
                model = %resolution.model.key(),
                path = ?resolution.path,
                ready = resolution.is_ready(),
                "model resolved"
            ),
            Err(e) if e.is_terminal() => warn!(
                namespace = %workload.namespace,
                workload = %workload.name,
                error = %e,
                "model resolution failed"
            ),
            Err(_) => {}
        }
        result
    }

    /// Re-fetch the previous reference and decide whether it can be reused
    /// for `request`.
    pub fn check_sticky(
        &self,
        request: &ModelRequest,
        previous: Option<&ModelReference>,
    ) -> ResolveResult<StickyState> {
        let Some(previous) = previous else {
            return Ok(StickyState::Absent);
        };
        let state = match self.store.get_model(&previous.key())? {
            None => StickyState::Stale(StaleTrigger::Missing),
            Some(model) if !serves_request(&model, request) => {
                StickyState::Stale(StaleTrigger::RequestChanged)
            }
            Some(model) if model.status.is_ready() => StickyState::Cached(Box::new(model)),
            Some(model) => StickyState::Stale(StaleTrigger::NotReady(model.status)),
        };
        Ok(state)
    }

    fn lookup(&self, request: &ModelRequest, workload: &WorkloadContext) -> ResolveResult<Lookup> {
        match request {
            ModelRequest::Ref { name } => self.resolve_by_ref(&workload.namespace, name),
            ModelRequest::Image { image } => self.resolve_by_image(image, workload),
            ModelRequest::Custom(spec) => self.resolve_by_custom_spec(spec, workload),
        }
    }

    fn resolve_by_ref(&self, namespace: &str, name: &str) -> ResolveResult<Lookup> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ResolveError::InvalidSpec("model reference has no name".into()));
        }
        for key in [ObjectKey::namespaced(namespace, name), ObjectKey::cluster(name)] {
            if let Some(model) = self.store.get_model(&key)? {
                debug!(%key, "model found by reference");
                return Ok(Lookup::Found(model, ResolutionPath::ByRef));
            }
        }
        Err(ResolveError::ModelNotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })
    }

    fn resolve_by_image(&self, image: &str, workload: &WorkloadContext) -> ResolveResult<Lookup> {
        let mut matches = find_models_with_image(self.store, &workload.namespace, image)?;
        match matches.len() {
            0 => Ok(Lookup::NeedsCreation(build_image_model(
                image,
                workload,
                self.limits,
            )?)),
            1 => Ok(Lookup::Found(matches.remove(0), ResolutionPath::ByImage)),
            _ => Err(ResolveError::MultipleModels {
                image: image.trim().to_string(),
                matches: matches.iter().map(|m| m.key().to_string()).collect(),
            }),
        }
    }

    fn resolve_by_custom_spec(
        &self,
        spec: &CustomModelSpec,
        workload: &WorkloadContext,
    ) -> ResolveResult<Lookup> {
        if spec.base_image.trim().is_empty() {
            return Err(ResolveError::InvalidSpec("custom model has no base image".into()));
        }
        if let Some(i) = spec
            .model_sources
            .iter()
            .position(|s| s.model_id.trim().is_empty() || s.source_uri.trim().is_empty())
        {
            return Err(ResolveError::InvalidSpec(format!(
                "model source {i} needs both modelId and sourceUri"
            )));
        }

        match find_matching_custom_model(self.store, &workload.namespace, spec)? {
            Some(model) => Ok(Lookup::Found(model, ResolutionPath::ByCustomSpec)),
            None => Ok(Lookup::NeedsCreation(build_custom_model(spec, workload, self.limits)?)),
        }
    }

    fn create_or_adopt(&self, planned: Model) -> ResolveResult<Resolution> {
        let key = planned.key();
        match self.store.create_model(&planned) {
            Ok(()) => {
                info!(%key, image = %planned.spec.image, "model created");
                Ok(Resolution::new(planned, ResolutionPath::Created))
            }
            Err(e) if e.is_already_exists() => {
                let existing = self
                    .store
                    .get_model(&key)?
                    .ok_or_else(|| ResolveError::Vanished(key.to_string()))?;
                if let Some(diff) = identity_difference(&existing, &planned) {
                    return Err(ResolveError::NameConflict {
                        name: key.to_string(),
                        dimension: diff.dimension,
                        existing: diff.existing,
                        requested: diff.requested,
                    });
                }
                info!(%key, "model created concurrently, adopting");
                Ok(Resolution::new(existing, ResolutionPath::Adopted))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn serves_request(model: &Model, request: &ModelRequest) -> bool {
    match request {
        ModelRequest::Ref { name } => model.name == name.trim(),
        ModelRequest::Image { image } => model.spec.image.trim() == image.trim(),
        ModelRequest::Custom(spec) => {
            model.spec.image.trim() == spec.base_image.trim()
                && sources_match(&model.spec.model_sources, &spec.model_sources)
        }
    }
}
