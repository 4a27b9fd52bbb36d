//! Multi-stage candidate filter.
//!
//! Stages run in a fixed order over the previous stage's survivors. Every
//! candidate a stage removes is recorded exactly once with a stage-scoped
//! reason. A stage that removes everything stops the pipeline.

use std::collections::BTreeSet;

use modelgrid_core::gpu::normalize_gpu_model;
use modelgrid_core::{Scope, ServiceOverrides};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidate::TemplateCandidate;
use crate::outcome::{CandidateEvaluation, EvaluationReason, SelectionDiagnostics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterStage {
    Availability,
    OptimizationPolicy,
    Overrides,
    HardwareAvailability,
    ScopePreference,
}

impl FilterStage {
    pub const PIPELINE: [FilterStage; 5] = [
        FilterStage::Availability,
        FilterStage::OptimizationPolicy,
        FilterStage::Overrides,
        FilterStage::HardwareAvailability,
        FilterStage::ScopePreference,
    ];

    /// `Ok` when the candidate survives, otherwise the rejection reason and message.
    fn check(
        self,
        candidate: &TemplateCandidate,
        ctx: &FilterContext<'_>,
        namespace_survivor: bool,
    ) -> Result<(), (EvaluationReason, String)> {
        match self {
            FilterStage::Availability => {
                if candidate.status.is_ready() {
                    Ok(())
                } else {
                    Err((
                        EvaluationReason::for_status(candidate.status),
                        format!("Template status is {}", candidate.status),
                    ))
                }
            }
            FilterStage::OptimizationPolicy => {
                if ctx.allow_unoptimized || candidate.is_optimized() {
                    Ok(())
                } else {
                    let kind = candidate
                        .profile_type()
                        .map(|t| t.as_str())
                        .unwrap_or("Unknown");
                    Err((
                        EvaluationReason::UnoptimizedTemplateFiltered,
                        format!("Profile type {kind} is filtered unless allowUnoptimized is set"),
                    ))
                }
            }
            FilterStage::Overrides => match ctx.overrides {
                Some(overrides) => match mismatched_override(candidate, overrides) {
                    None => Ok(()),
                    Some(dimension) => Err((
                        EvaluationReason::ServiceOverridesNotMatched,
                        format!("Template {dimension} does not match service overrides"),
                    )),
                },
                None => Ok(()),
            },
            FilterStage::HardwareAvailability => match candidate.effective_gpu_model() {
                None => Ok(()),
                Some(model) => {
                    let normalized = normalize_gpu_model(model);
                    if normalized.is_empty() || ctx.available_gpus.contains(&normalized) {
                        Ok(())
                    } else {
                        Err((
                            EvaluationReason::RequiredGpuNotInCluster,
                            format!("Required GPU {model} is not present in the cluster"),
                        ))
                    }
                }
            },
            FilterStage::ScopePreference => {
                if candidate.scope() == Scope::Cluster && namespace_survivor {
                    Err((
                        EvaluationReason::NamespaceTemplatePreferred,
                        "A namespace-scoped template shadows this cluster template".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// First override dimension the candidate fails, if any.
fn mismatched_override(
    candidate: &TemplateCandidate,
    overrides: &ServiceOverrides,
) -> Option<&'static str> {
    let text_matches = |wanted: Option<&String>, actual: Option<&str>| match wanted
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
    {
        None => true,
        Some(wanted) => actual.is_some_and(|a| a.eq_ignore_ascii_case(wanted)),
    };

    if !text_matches(overrides.metric.as_ref(), candidate.effective_metric()) {
        return Some("metric");
    }
    if !text_matches(overrides.precision.as_ref(), candidate.effective_precision()) {
        return Some("precision");
    }
    if let Some(gpu) = &overrides.gpu_selector {
        let wanted = gpu.model.trim();
        if !wanted.is_empty()
            && !candidate
                .effective_gpu_model()
                .is_some_and(|m| m.eq_ignore_ascii_case(wanted))
        {
            return Some("GPU model");
        }
        let actual_count = candidate.effective_gpu_count();
        if gpu.count > 0 && actual_count > 0 && gpu.count != actual_count {
            return Some("GPU count");
        }
    }
    None
}

/// Inputs shared by every stage.
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    pub overrides: Option<&'a ServiceOverrides>,
    /// Normalized GPU model names present in the cluster.
    pub available_gpus: BTreeSet<String>,
    pub allow_unoptimized: bool,
}

impl<'a> FilterContext<'a> {
    /// Build a context, normalizing the raw inventory.
    pub fn new(
        overrides: Option<&'a ServiceOverrides>,
        raw_gpus: &BTreeSet<String>,
        allow_unoptimized: bool,
    ) -> Self {
        Self {
            overrides: overrides.filter(|o| !o.is_empty()),
            available_gpus: modelgrid_core::gpu::normalize_inventory(raw_gpus),
            allow_unoptimized,
        }
    }
}

/// Survivors, rejections and per-stage counts of one pipeline run.
#[derive(Debug, Clone)]
pub struct FilterReport<'a> {
    pub survivors: Vec<&'a TemplateCandidate>,
    /// Rejections in stage order, then input order within a stage.
    pub rejections: Vec<CandidateEvaluation>,
    pub diagnostics: SelectionDiagnostics,
}

/// Run every stage over `candidates`.
pub fn run_filters<'a>(
    candidates: &'a [TemplateCandidate],
    ctx: &FilterContext<'_>,
) -> FilterReport<'a> {
    let mut diagnostics = SelectionDiagnostics {
        total_candidates: candidates.len(),
        ..Default::default()
    };
    let mut rejections = Vec::new();
    let mut survivors: Vec<&TemplateCandidate> = candidates.iter().collect();

    if survivors.is_empty() {
        return FilterReport {
            survivors,
            rejections,
            diagnostics,
        };
    }

    for stage in FilterStage::PIPELINE {
        let namespace_survivor = survivors.iter().any(|c| c.scope() == Scope::Namespace);
        let mut kept = Vec::with_capacity(survivors.len());
        let before = rejections.len();
        for candidate in survivors {
            match stage.check(candidate, ctx, namespace_survivor) {
                Ok(()) => kept.push(candidate),
                Err((reason, message)) => rejections.push(CandidateEvaluation::rejected(
                    candidate, stage, reason, message,
                )),
            }
        }
        let removed = rejections.len() - before;
        if stage == FilterStage::OptimizationPolicy {
            diagnostics.unoptimized_filtered = removed;
        }
        diagnostics.record(stage, kept.len());
        debug!(?stage, kept = kept.len(), removed, "filter stage applied");

        survivors = kept;
        if survivors.is_empty() {
            diagnostics.emptied_at = Some(stage);
            break;
        }
    }

    FilterReport {
        survivors,
        rejections,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgrid_core::{GpuSelector, ObjectKey, ProfileType, ResourceStatus, TemplateProfile};

    fn make_candidate(
        name: &str,
        scope: Scope,
        status: ResourceStatus,
        profile: Option<(ProfileType, &str, u32, &str, &str)>,
    ) -> TemplateCandidate {
        TemplateCandidate {
            key: match scope {
                Scope::Namespace => ObjectKey::namespaced("ns", name),
                Scope::Cluster => ObjectKey::cluster(name),
            },
            model_name: "llama".into(),
            status,
            metric: None,
            precision: None,
            gpu_selector: None,
            profile: profile.map(|(t, gpu, count, metric, precision)| TemplateProfile {
                profile_type: Some(t),
                gpu: gpu.into(),
                gpu_count: count,
                metric: metric.into(),
                precision: precision.into(),
            }),
        }
    }

    fn optimized(name: &str, gpu: &str) -> TemplateCandidate {
        make_candidate(
            name,
            Scope::Namespace,
            ResourceStatus::Ready,
            Some((ProfileType::Optimized, gpu, 1, "latency", "fp8")),
        )
    }

    fn gpus(models: &[&str]) -> BTreeSet<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn availability_rejects_with_status_reason() {
        let candidates = vec![
            make_candidate("a", Scope::Namespace, ResourceStatus::Pending, None),
            make_candidate("b", Scope::Namespace, ResourceStatus::Degraded, None),
        ];
        let ctx = FilterContext::new(None, &gpus(&[]), true);
        let report = run_filters(&candidates, &ctx);

        assert!(report.survivors.is_empty());
        assert_eq!(report.diagnostics.emptied_at, Some(FilterStage::Availability));
        let reasons: Vec<_> = report.rejections.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![EvaluationReason::TemplatePending, EvaluationReason::TemplateDegraded]
        );
    }

    #[test]
    fn unoptimized_filtered_unless_allowed() {
        let candidates = vec![
            make_candidate(
                "preview",
                Scope::Namespace,
                ResourceStatus::Ready,
                Some((ProfileType::Preview, "MI300X", 1, "latency", "fp8")),
            ),
            make_candidate("bare", Scope::Namespace, ResourceStatus::Ready, None),
        ];
        let inventory = gpus(&["MI300X"]);

        let strict = run_filters(&candidates, &FilterContext::new(None, &inventory, false));
        assert!(strict.survivors.is_empty());
        assert_eq!(strict.diagnostics.unoptimized_filtered, 2);
        assert_eq!(strict.diagnostics.emptied_at, Some(FilterStage::OptimizationPolicy));

        let lenient = run_filters(&candidates, &FilterContext::new(None, &inventory, true));
        assert_eq!(lenient.survivors.len(), 2);
        assert_eq!(lenient.diagnostics.unoptimized_filtered, 0);
    }

    #[test]
    fn overrides_compare_case_insensitively() {
        let candidates = vec![optimized("a", "MI300X")];
        let overrides = ServiceOverrides {
            metric: Some("LATENCY".into()),
            precision: Some("FP8".into()),
            gpu_selector: Some(GpuSelector {
                model: " mi300x ".into(),
                count: 0,
            }),
        };
        let ctx = FilterContext::new(Some(&overrides), &gpus(&["MI300X"]), false);
        assert_eq!(run_filters(&candidates, &ctx).survivors.len(), 1);
    }

    #[test]
    fn overrides_reject_mismatch_and_record_it() {
        let mut candidates = vec![optimized("a", "MI300X"), optimized("b", "MI300X")];
        candidates[1].profile.as_mut().unwrap().precision = "fp16".into();
        let overrides = ServiceOverrides {
            precision: Some("fp16".into()),
            ..Default::default()
        };
        let ctx = FilterContext::new(Some(&overrides), &gpus(&["MI300X"]), false);
        let report = run_filters(&candidates, &ctx);

        assert_eq!(report.survivors.len(), 1);
        assert_eq!(report.survivors[0].name(), "b");
        assert_eq!(report.rejections.len(), 1);
        assert_eq!(report.rejections[0].name, "a");
        assert_eq!(report.rejections[0].reason, EvaluationReason::ServiceOverridesNotMatched);
        assert_eq!(report.diagnostics.after_overrides, 1);
    }

    #[test]
    fn gpu_count_compared_only_when_both_positive() {
        let mut no_count = optimized("a", "MI300X");
        no_count.profile.as_mut().unwrap().gpu_count = 0;
        let candidates = vec![no_count, optimized("b", "MI300X")];
        let overrides = ServiceOverrides {
            gpu_selector: Some(GpuSelector {
                model: String::new(),
                count: 4,
            }),
            ..Default::default()
        };
        let ctx = FilterContext::new(Some(&overrides), &gpus(&["MI300X"]), false);
        let report = run_filters(&candidates, &ctx);
        let names: Vec<&str> = report.survivors.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn hardware_stage_normalizes_and_passes_gpu_free_templates() {
        let candidates = vec![
            optimized("mi300", "mi300x"),
            optimized("mi325", "MI325X"),
            optimized("cpu", ""),
        ];
        let ctx = FilterContext::new(None, &gpus(&["AMD Instinct MI300X"]), false);
        let report = run_filters(&candidates, &ctx);

        let names: Vec<&str> = report.survivors.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["mi300", "cpu"]);
        assert_eq!(report.rejections[0].reason, EvaluationReason::RequiredGpuNotInCluster);
    }

    #[test]
    fn empty_inventory_rejects_gpu_templates() {
        let candidates = vec![optimized("a", "MI300X")];
        let report = run_filters(&candidates, &FilterContext::new(None, &gpus(&[]), false));
        assert_eq!(report.diagnostics.emptied_at, Some(FilterStage::HardwareAvailability));
        assert_eq!(report.rejections.len(), 1);
    }

    #[test]
    fn namespace_templates_shadow_cluster_templates() {
        let mut cluster = optimized("shared", "MI300X");
        cluster.key = ObjectKey::cluster("shared");
        let candidates = vec![cluster, optimized("local", "MI300X")];
        let ctx = FilterContext::new(None, &gpus(&["MI300X"]), false);
        let report = run_filters(&candidates, &ctx);

        assert_eq!(report.survivors.len(), 1);
        assert_eq!(report.survivors[0].name(), "local");
        assert_eq!(report.rejections[0].reason, EvaluationReason::NamespaceTemplatePreferred);
        assert_eq!(report.diagnostics.after_scope, 1);
    }

    #[test]
    fn every_candidate_is_accounted_for() {
        let candidates = vec![
            make_candidate("pending", Scope::Namespace, ResourceStatus::Pending, None),
            make_candidate(
                "preview",
                Scope::Namespace,
                ResourceStatus::Ready,
                Some((ProfileType::Preview, "MI300X", 1, "latency", "fp8")),
            ),
            optimized("h100", "H100"),
            optimized("ok", "MI300X"),
        ];
        let ctx = FilterContext::new(None, &gpus(&["MI300X"]), false);
        let report = run_filters(&candidates, &ctx);

        let accounted: Vec<&str> = report
            .rejections
            .iter()
            .map(|e| e.name.as_str())
            .chain(report.survivors.iter().map(|c| c.name()))
            .collect();
        let unique: BTreeSet<&str> = accounted.iter().copied().collect();
        let expected: BTreeSet<&str> = candidates.iter().map(|c| c.name()).collect();
        assert_eq!(unique, expected);
        assert_eq!(accounted.len(), candidates.len(), "a candidate was counted twice");
    }
}
