//! Selection results, reason codes and diagnostics.

use modelgrid_core::{ResourceStatus, Scope};
use modelgrid_state::ServiceTemplate;
use serde::{Deserialize, Serialize};

use crate::candidate::TemplateCandidate;
use crate::filter::FilterStage;

/// Why a candidate ended where it did. Serialized names are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationReason {
    TemplatePending,
    TemplateProgressing,
    TemplateNotAvailable,
    TemplateDegraded,
    TemplateFailed,
    TemplateNotReady,
    UnoptimizedTemplateFiltered,
    ServiceOverridesNotMatched,
    #[serde(rename = "RequiredGPUNotInCluster")]
    RequiredGpuNotInCluster,
    NamespaceTemplatePreferred,
    LowerPreferenceRank,
    TiedPreferenceRank,
    BestMatch,
}

impl EvaluationReason {
    /// Rejection reason for a template that is not ready.
    pub fn for_status(status: ResourceStatus) -> Self {
        match status {
            ResourceStatus::Pending => EvaluationReason::TemplatePending,
            ResourceStatus::Progressing => EvaluationReason::TemplateProgressing,
            ResourceStatus::NotAvailable => EvaluationReason::TemplateNotAvailable,
            ResourceStatus::Degraded => EvaluationReason::TemplateDegraded,
            ResourceStatus::Failed => EvaluationReason::TemplateFailed,
            _ => EvaluationReason::TemplateNotReady,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationReason::TemplatePending => "TemplatePending",
            EvaluationReason::TemplateProgressing => "TemplateProgressing",
            EvaluationReason::TemplateNotAvailable => "TemplateNotAvailable",
            EvaluationReason::TemplateDegraded => "TemplateDegraded",
            EvaluationReason::TemplateFailed => "TemplateFailed",
            EvaluationReason::TemplateNotReady => "TemplateNotReady",
            EvaluationReason::UnoptimizedTemplateFiltered => "UnoptimizedTemplateFiltered",
            EvaluationReason::ServiceOverridesNotMatched => "ServiceOverridesNotMatched",
            EvaluationReason::RequiredGpuNotInCluster => "RequiredGPUNotInCluster",
            EvaluationReason::NamespaceTemplatePreferred => "NamespaceTemplatePreferred",
            EvaluationReason::LowerPreferenceRank => "LowerPreferenceRank",
            EvaluationReason::TiedPreferenceRank => "TiedPreferenceRank",
            EvaluationReason::BestMatch => "BestMatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Chosen,
    Rejected,
}

/// Terminal verdict for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEvaluation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub scope: Scope,
    pub status: EvaluationStatus,
    pub reason: EvaluationReason,
    pub message: String,
    /// Competition rank among scored survivors, 1 = best.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    /// Filter stage that removed the candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<FilterStage>,
}

impl CandidateEvaluation {
    pub fn rejected(
        candidate: &TemplateCandidate,
        stage: FilterStage,
        reason: EvaluationReason,
        message: String,
    ) -> Self {
        Self {
            name: candidate.key.name.clone(),
            namespace: candidate.key.namespace.clone(),
            scope: candidate.scope(),
            status: EvaluationStatus::Rejected,
            reason,
            message,
            rank: None,
            stage: Some(stage),
        }
    }

    pub fn ranked(
        candidate: &TemplateCandidate,
        status: EvaluationStatus,
        reason: EvaluationReason,
        rank: usize,
    ) -> Self {
        let message = match reason {
            EvaluationReason::BestMatch => "Selected as best match".to_string(),
            EvaluationReason::TiedPreferenceRank => {
                format!("Tied at preference rank {rank} with another template")
            }
            _ => format!("Preference rank {rank}"),
        };
        Self {
            name: candidate.key.name.clone(),
            namespace: candidate.key.namespace.clone(),
            scope: candidate.scope(),
            status,
            reason,
            message,
            rank: Some(rank),
            stage: None,
        }
    }
}

/// Survivor counts after each filter stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionDiagnostics {
    pub total_candidates: usize,
    pub after_availability: usize,
    pub after_optimization: usize,
    pub after_overrides: usize,
    pub after_hardware: usize,
    pub after_scope: usize,
    /// Candidates removed only because they are not optimized.
    pub unoptimized_filtered: usize,
    /// First stage that left no survivors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emptied_at: Option<FilterStage>,
}

impl SelectionDiagnostics {
    pub(crate) fn record(&mut self, stage: FilterStage, survivors: usize) {
        let slot = match stage {
            FilterStage::Availability => &mut self.after_availability,
            FilterStage::OptimizationPolicy => &mut self.after_optimization,
            FilterStage::Overrides => &mut self.after_overrides,
            FilterStage::HardwareAvailability => &mut self.after_hardware,
            FilterStage::ScopePreference => &mut self.after_scope,
        };
        *slot = survivors;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStatus {
    /// Exactly one best template.
    Selected,
    /// Several templates share the best preference rank.
    Ambiguous,
    /// No template can serve the request.
    NotFound,
    /// Templates exist but none is ready yet; wait rather than fail.
    NotReady,
}

/// Outcome-level reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionReason {
    TemplateSelected,
    TemplateNotFound,
    TemplateSelectionAmbiguous,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::TemplateSelected => "TemplateSelected",
            SelectionReason::TemplateNotFound => "TemplateNotFound",
            SelectionReason::TemplateSelectionAmbiguous => "TemplateSelectionAmbiguous",
        }
    }
}

/// Chosen template together with the object fetched from its scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedTemplate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub scope: Scope,
    pub template: ServiceTemplate,
}

/// Full answer of the selection orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOutcome {
    pub status: SelectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<SelectedTemplate>,
    /// Candidates sharing the best preference rank.
    pub matching_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SelectionReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub diagnostics: SelectionDiagnostics,
    pub evaluations: Vec<CandidateEvaluation>,
}

impl SelectionOutcome {
    pub fn is_selected(&self) -> bool {
        self.status == SelectionStatus::Selected
    }

    /// Templates exist but are not ready; the caller should wait.
    pub fn templates_exist_but_not_ready(&self) -> bool {
        self.status == SelectionStatus::NotReady
    }
}
