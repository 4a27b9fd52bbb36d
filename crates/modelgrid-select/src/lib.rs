//! ModelGrid template selection: staged filtering, preference ranking,
//! ambiguity detection.
//!
//! This crate decides which deployment template a workload binds to. It
//! does NOT place pods or persist decisions; it reads the catalog, filters
//! and ranks candidates, and reports an outcome with a verdict for every
//! candidate it looked at.
//!
//! # Components
//!
//! - **`candidate`**: Template snapshots and catalog gathering
//! - **`filter`**: Five-stage filter pipeline with per-stage rejections
//! - **`scorer`**: Lexicographic preference ranking with tie counting
//! - **`selector`**: Orchestrator and explicit template lookup
//! - **`outcome`**: Outcome, diagnostics and reason codes

pub mod candidate;
pub mod error;
pub mod filter;
pub mod outcome;
pub mod scorer;
pub mod selector;

pub use candidate::{TemplateCandidate, gather_candidates};
pub use error::{SelectError, SelectResult};
pub use filter::{FilterContext, FilterReport, FilterStage, run_filters};
pub use outcome::{
    CandidateEvaluation, EvaluationReason, EvaluationStatus, SelectedTemplate,
    SelectionDiagnostics, SelectionOutcome, SelectionReason, SelectionStatus,
};
pub use scorer::{PreferenceTable, PreferenceTables, RankKey, ScoreOutcome, score_candidates};
pub use selector::{Selection, SelectionRequest, TemplateSelector, select_best_template};
