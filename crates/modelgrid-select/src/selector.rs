//! Selection orchestrator: composes the filter pipeline and the scorer.
//!
//! [`select_best_template`] is a pure function of its inputs. The
//! [`TemplateSelector`] wraps it with catalog reads, inventory lookup and
//! fetching the winning template from its scope.

use std::collections::BTreeSet;

use modelgrid_core::naming::derived_template_name;
use modelgrid_core::{NameLimits, ObjectKey, ServiceOverrides};
use modelgrid_state::{HardwareInventory, ServiceTemplate, TemplateCatalog};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::candidate::{TemplateCandidate, gather_candidates};
use crate::error::{SelectError, SelectResult};
use crate::filter::{FilterContext, FilterReport, FilterStage, run_filters};
use crate::outcome::{
    CandidateEvaluation, EvaluationReason, EvaluationStatus, SelectedTemplate,
    SelectionDiagnostics, SelectionOutcome, SelectionReason, SelectionStatus,
};
use crate::scorer::{PreferenceTables, score_candidates};

/// Result of the pure selection step.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub status: SelectionStatus,
    pub chosen: Option<&'a TemplateCandidate>,
    /// Candidates sharing the best preference rank; 0 when nothing survived.
    pub matching_count: usize,
    pub diagnostics: SelectionDiagnostics,
    /// One terminal evaluation per input candidate.
    pub evaluations: Vec<CandidateEvaluation>,
}

/// Filter and rank `candidates`, never breaking a preference tie.
pub fn select_best_template<'a>(
    candidates: &'a [TemplateCandidate],
    overrides: Option<&ServiceOverrides>,
    available_gpus: &BTreeSet<String>,
    allow_unoptimized: bool,
    tables: &PreferenceTables,
) -> Selection<'a> {
    let ctx = FilterContext::new(overrides, available_gpus, allow_unoptimized);
    let FilterReport {
        survivors,
        rejections: mut evaluations,
        diagnostics,
    } = run_filters(candidates, &ctx);

    if survivors.is_empty() {
        let status = match diagnostics.emptied_at {
            Some(FilterStage::Availability) => SelectionStatus::NotReady,
            _ => SelectionStatus::NotFound,
        };
        return Selection {
            status,
            chosen: None,
            matching_count: 0,
            diagnostics,
            evaluations,
        };
    }

    if let [only] = survivors.as_slice() {
        evaluations.push(CandidateEvaluation::ranked(
            only,
            EvaluationStatus::Chosen,
            EvaluationReason::BestMatch,
            1,
        ));
        return Selection {
            status: SelectionStatus::Selected,
            chosen: Some(*only),
            matching_count: 1,
            diagnostics,
            evaluations,
        };
    }

    let scores = score_candidates(&survivors, tables);
    let ambiguous = scores.tie_count > 1;
    let chosen = if ambiguous {
        None
    } else {
        scores.best.map(|b| survivors[b])
    };

    for (i, candidate) in survivors.iter().enumerate() {
        let rank = scores.rank_of(i);
        let (status, reason) = if ambiguous && scores.is_tied_with_best(i) {
            (EvaluationStatus::Rejected, EvaluationReason::TiedPreferenceRank)
        } else if !ambiguous && scores.best == Some(i) {
            (EvaluationStatus::Chosen, EvaluationReason::BestMatch)
        } else {
            (EvaluationStatus::Rejected, EvaluationReason::LowerPreferenceRank)
        };
        evaluations.push(CandidateEvaluation::ranked(candidate, status, reason, rank));
    }

    Selection {
        status: if ambiguous {
            SelectionStatus::Ambiguous
        } else {
            SelectionStatus::Selected
        },
        chosen,
        matching_count: scores.tie_count,
        diagnostics,
        evaluations,
    }
}

/// Reason code and message for a selection of `model_name`.
fn describe(selection: &Selection<'_>, model_name: &str) -> (Option<SelectionReason>, Option<String>) {
    let diagnostics = &selection.diagnostics;
    match selection.status {
        SelectionStatus::Selected => {
            let key = selection.chosen.map(|c| c.key.to_string()).unwrap_or_default();
            (
                Some(SelectionReason::TemplateSelected),
                Some(format!("Selected template {key} for model {model_name:?}")),
            )
        }
        SelectionStatus::Ambiguous => (
            Some(SelectionReason::TemplateSelectionAmbiguous),
            Some(format!(
                "Multiple templates ({}) satisfy model {model_name:?}",
                selection.matching_count
            )),
        ),
        SelectionStatus::NotReady => (None, None),
        SelectionStatus::NotFound => {
            let message = if diagnostics.total_candidates == 0 {
                format!("No templates found for model {model_name:?}")
            } else if diagnostics.emptied_at == Some(FilterStage::OptimizationPolicy) {
                format!(
                    "No available templates match requirements for model {model_name:?}: \
                     {} unoptimized template(s) filtered out. Set allowUnoptimized to use them.",
                    diagnostics.unoptimized_filtered
                )
            } else {
                format!("No available templates match requirements for model {model_name:?}")
            };
            (Some(SelectionReason::TemplateNotFound), Some(message))
        }
    }
}

/// What a workload asks the selector for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    pub namespace: String,
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ServiceOverrides>,
    #[serde(default)]
    pub allow_unoptimized: bool,
}

/// Catalog-backed template selection.
pub struct TemplateSelector<'s, S: ?Sized> {
    store: &'s S,
    tables: PreferenceTables,
    limits: NameLimits,
}

impl<'s, S: ?Sized> TemplateSelector<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            tables: PreferenceTables::default(),
            limits: NameLimits::default(),
        }
    }

    pub fn with_tables(mut self, tables: PreferenceTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_name_limits(mut self, limits: NameLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl<S: TemplateCatalog + HardwareInventory + ?Sized> TemplateSelector<'_, S> {
    /// Choose the template serving `request.model_name` in `request.namespace`.
    pub fn select_for_model(&self, request: &SelectionRequest) -> SelectResult<SelectionOutcome> {
        let model = request.model_name.as_str();
        let candidates = gather_candidates(self.store, &request.namespace, model)?;
        let gpus = if candidates.is_empty() {
            BTreeSet::new()
        } else {
            self.store.available_gpus()?
        };

        let selection = select_best_template(
            &candidates,
            request.overrides.as_ref(),
            &gpus,
            request.allow_unoptimized,
            &self.tables,
        );
        let (reason, message) = describe(&selection, model);

        let selected = match selection.chosen {
            Some(candidate) => Some(self.fetch(candidate)?),
            None => None,
        };

        match selection.status {
            SelectionStatus::Selected => info!(
                namespace = %request.namespace,
                model,
                template = %selection.chosen.map(|c| c.key.to_string()).unwrap_or_default(),
                "template selected"
            ),
            SelectionStatus::Ambiguous => warn!(
                namespace = %request.namespace,
                model,
                tied = selection.matching_count,
                "template selection ambiguous"
            ),
            SelectionStatus::NotReady => debug!(
                namespace = %request.namespace,
                model,
                "templates exist but none is ready"
            ),
            SelectionStatus::NotFound => debug!(
                namespace = %request.namespace,
                model,
                emptied_at = ?selection.diagnostics.emptied_at,
                "no template matches"
            ),
        }

        Ok(SelectionOutcome {
            status: selection.status,
            selected,
            matching_count: selection.matching_count,
            reason,
            message,
            diagnostics: selection.diagnostics,
            evaluations: selection.evaluations,
        })
    }

    fn fetch(&self, candidate: &TemplateCandidate) -> SelectResult<SelectedTemplate> {
        let template = self
            .store
            .get_template(&candidate.key)?
            .ok_or_else(|| SelectError::Vanished(candidate.key.to_string()))?;
        Ok(SelectedTemplate {
            name: candidate.key.name.clone(),
            namespace: candidate.key.namespace.clone(),
            scope: candidate.scope(),
            template,
        })
    }
}

impl<S: TemplateCatalog + ?Sized> TemplateSelector<'_, S> {
    /// Resolve a template the workload names explicitly.
    ///
    /// With overrides the derived name is looked up in the namespace; the
    /// base name is then tried in cluster scope.
    pub fn lookup_template(
        &self,
        namespace: &str,
        name: &str,
        overrides: Option<&ServiceOverrides>,
    ) -> SelectResult<ServiceTemplate> {
        let namespaced_name = match overrides {
            Some(overrides) => derived_template_name(name, overrides, self.limits)?,
            None => name.to_string(),
        };

        let key = ObjectKey::namespaced(namespace, &namespaced_name);
        if let Some(template) = self.store.get_template(&key)? {
            debug!(%key, "explicit template found in namespace");
            return Ok(template);
        }
        let key = ObjectKey::cluster(name);
        if let Some(template) = self.store.get_template(&key)? {
            debug!(%key, "explicit template found in cluster scope");
            return Ok(template);
        }

        warn!(%namespace, template = name, "explicit template not found");
        Err(SelectError::TemplateNotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })
    }
}
