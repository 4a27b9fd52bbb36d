//! Preference scoring for template selection.
//!
//! Candidates are ranked on four dimensions compared in strict priority
//! order:
//! - **Profile type**: Optimized > Preview > Unoptimized
//! - **GPU tier**: newest accelerator generation first
//! - **Metric**: latency > throughput
//! - **Precision**: narrowest first, integer before float at equal width
//!
//! Lower rank numbers are better. Values missing from a table rank after
//! every listed value.

use std::collections::HashMap;

use modelgrid_core::config::PreferencesConfig;
use modelgrid_core::gpu::normalize_gpu_model;
use serde::{Deserialize, Serialize};

use crate::candidate::TemplateCandidate;

/// Added to a table's length to rank values the table does not list.
pub const UNKNOWN_RANK_PENALTY: usize = 1000;

pub const PROFILE_TYPE_ORDER: &[&str] = &["Optimized", "Preview", "Unoptimized"];
pub const GPU_TIER_ORDER: &[&str] = &[
    "MI355X", "MI325X", "MI300X", "MI250X", "MI210", "H200", "H100", "A100",
];
pub const METRIC_ORDER: &[&str] = &["latency", "throughput"];
pub const PRECISION_ORDER: &[&str] = &["int4", "fp4", "int8", "fp8", "fp16", "bf16", "fp32"];

/// Immutable rank map built from an ordered list. Lookups ignore case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceTable {
    ranks: HashMap<String, usize>,
    len: usize,
}

impl PreferenceTable {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranks = HashMap::new();
        let mut len = 0;
        for value in order {
            let key = value.as_ref().trim().to_uppercase();
            if key.is_empty() || ranks.contains_key(&key) {
                continue;
            }
            ranks.insert(key, len);
            len += 1;
        }
        Self { ranks, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn rank(&self, value: &str) -> usize {
        self.ranks
            .get(&value.trim().to_uppercase())
            .copied()
            .unwrap_or(self.len + UNKNOWN_RANK_PENALTY)
    }
}

/// The four ranking tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceTables {
    pub profile_type: PreferenceTable,
    pub gpu_tier: PreferenceTable,
    pub metric: PreferenceTable,
    pub precision: PreferenceTable,
}

impl Default for PreferenceTables {
    fn default() -> Self {
        Self {
            profile_type: PreferenceTable::new(PROFILE_TYPE_ORDER),
            gpu_tier: PreferenceTable::new(GPU_TIER_ORDER),
            metric: PreferenceTable::new(METRIC_ORDER),
            precision: PreferenceTable::new(PRECISION_ORDER),
        }
    }
}

impl PreferenceTables {
    /// Defaults with GPU tier and precision orders replaced where configured.
    pub fn from_config(config: &PreferencesConfig) -> Self {
        let mut tables = Self::default();
        if let Some(tiers) = &config.gpu_tiers {
            tables.gpu_tier = PreferenceTable::new(tiers.iter().map(|t| normalize_gpu_model(t)));
        }
        if let Some(precisions) = &config.precisions {
            tables.precision = PreferenceTable::new(precisions);
        }
        tables
    }

    pub fn rank_key(&self, candidate: &TemplateCandidate) -> RankKey {
        let profile_type = candidate.profile_type().map(|t| t.as_str()).unwrap_or("");
        let gpu = normalize_gpu_model(candidate.effective_gpu_model().unwrap_or(""));
        RankKey {
            profile_type: self.profile_type.rank(profile_type),
            gpu_tier: self.gpu_tier.rank(&gpu),
            metric: self.metric.rank(candidate.effective_metric().unwrap_or("")),
            precision: self.precision.rank(candidate.effective_precision().unwrap_or("")),
        }
    }
}

/// Rank tuple of one candidate. Field order is comparison priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankKey {
    pub profile_type: usize,
    pub gpu_tier: usize,
    pub metric: usize,
    pub precision: usize,
}

/// Result of scoring a candidate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOutcome {
    /// Index of the first strictly-best candidate.
    pub best: Option<usize>,
    /// Candidates sharing the best candidate's complete rank tuple.
    pub tie_count: usize,
    /// Rank tuple per input candidate, in input order.
    pub keys: Vec<RankKey>,
}

impl ScoreOutcome {
    /// Competition rank of candidate `index`: one plus the number strictly better.
    pub fn rank_of(&self, index: usize) -> usize {
        let key = self.keys[index];
        1 + self.keys.iter().filter(|k| **k < key).count()
    }

    pub fn is_tied_with_best(&self, index: usize) -> bool {
        self.best.is_some_and(|b| self.keys[b] == self.keys[index])
    }
}

/// Score `candidates`; a later candidate replaces the best only if strictly better.
pub fn score_candidates(candidates: &[&TemplateCandidate], tables: &PreferenceTables) -> ScoreOutcome {
    let keys: Vec<RankKey> = candidates.iter().map(|c| tables.rank_key(c)).collect();

    let mut best: Option<usize> = None;
    for (i, key) in keys.iter().enumerate() {
        if best.is_none_or(|b| *key < keys[b]) {
            best = Some(i);
        }
    }

    let tie_count = best.map_or(0, |b| keys.iter().filter(|k| **k == keys[b]).count());
    ScoreOutcome {
        best,
        tie_count,
        keys,
    }
}
