//! Local analysis assembly and merge with an external opinion.
//!
//! Whatever the source, the multiplier of a finished analysis lies in
//! `[MIN_ENHANCEMENT_MULTIPLIER, MAX_ENHANCEMENT_MULTIPLIER]`.

use crate::constants::{MAX_ENHANCEMENT_MULTIPLIER, MIN_ENHANCEMENT_MULTIPLIER};
use crate::enhancement::classify;
use crate::tef::base_tef;
use crate::{round2, MealEntry, Timestamp};
use serde::{Deserialize, Serialize};

/// Which side supplied the winning multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    #[default]
    Local,
    External,
    /// The caller supplied the multiplier directly.
    Override,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::Local => "local",
            AnalysisSource::External => "external",
            AnalysisSource::Override => "override",
        }
    }
}

/// A finished TEF analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TefAnalysis {
    /// Baseline thermic effect, kcal.
    pub base_tef: f64,
    /// Baseline as a share of logged calories, percent.
    pub base_tef_percentage: f64,
    pub enhancement_multiplier: f64,
    /// `base_tef * enhancement_multiplier`, kcal.
    pub enhanced_tef: f64,
    pub enhancement_factors: Vec<String>,
    pub analysis_timestamp: Timestamp,
    /// Snapshots written before provenance was tracked decode as `Local`.
    #[serde(default)]
    pub source: AnalysisSource,
}

/// The parts of an external classification the merge cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalOpinion {
    pub multiplier: Option<f64>,
    pub factors: Vec<String>,
}

impl ExternalOpinion {
    pub fn new(multiplier: Option<f64>, factors: Vec<String>) -> Self {
        Self { multiplier, factors }
    }

    /// An opinion that carries nothing.
    pub fn is_empty(&self) -> bool {
        self.multiplier.is_none() && self.factors.is_empty()
    }
}

/// Clamp a multiplier into the allowed range. NaN maps to the floor.
pub fn clamp_multiplier(multiplier: f64) -> f64 {
    if multiplier.is_nan() {
        return MIN_ENHANCEMENT_MULTIPLIER;
    }
    multiplier.clamp(MIN_ENHANCEMENT_MULTIPLIER, MAX_ENHANCEMENT_MULTIPLIER)
}

/// Build an analysis from local estimates, optionally overriding the
/// multiplier. The override is clamped like any external value and tagged
/// [`AnalysisSource::Override`]; a non-finite override is ignored.
pub fn compute_analysis(
    entries: &[MealEntry],
    multiplier: Option<f64>,
    now: Timestamp,
) -> TefAnalysis {
    let mut analysis =
        merge_analysis(entries, Some(ExternalOpinion::new(multiplier, Vec::new())), now);
    if analysis.source == AnalysisSource::External {
        analysis.source = AnalysisSource::Override;
    }
    analysis
}

/// Merge the local baseline and classifier with an optional external
/// opinion.
///
/// The external multiplier wins when present; external factors win when
/// non-empty. Either way the multiplier is clamped.
pub fn merge_analysis(
    entries: &[MealEntry],
    opinion: Option<ExternalOpinion>,
    now: Timestamp,
) -> TefAnalysis {
    let base = base_tef(entries);
    let local = classify(entries);
    let opinion = opinion.unwrap_or_default();

    let (raw_multiplier, source) = match opinion.multiplier {
        Some(m) if m.is_finite() => (m, AnalysisSource::External),
        _ => (local.suggested_multiplier, AnalysisSource::Local),
    };
    let multiplier = clamp_multiplier(raw_multiplier);

    let factors = if opinion.factors.is_empty() {
        local.factors
    } else {
        opinion.factors
    };

    TefAnalysis {
        base_tef: round2(base.total_tef),
        base_tef_percentage: round2(base.percentage),
        enhancement_multiplier: multiplier,
        enhanced_tef: round2(base.total_tef * multiplier),
        enhancement_factors: factors,
        analysis_timestamp: now,
        source,
    }
}
