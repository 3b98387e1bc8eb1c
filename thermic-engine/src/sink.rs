//! Where the event loop delivers results.

use thermic_core::TefAnalysis;

/// Receives analysis updates for the current meal list.
pub trait AnalysisSink: Send {
    /// A fresh or cached analysis now describes the current list.
    fn apply(&mut self, analysis: &TefAnalysis);

    /// The list became empty; drop whatever is displayed.
    fn clear(&mut self);

    /// Debounce countdown in ticks, `None` when nothing is scheduled.
    fn countdown(&mut self, remaining: Option<u32>);
}

/// Logs every update and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalysisSink for TracingSink {
    fn apply(&mut self, analysis: &TefAnalysis) {
        tracing::info!(
            base_tef = analysis.base_tef,
            enhanced_tef = analysis.enhanced_tef,
            multiplier = analysis.enhancement_multiplier,
            factors = ?analysis.enhancement_factors,
            "TEF analysis updated"
        );
    }

    fn clear(&mut self) {
        tracing::info!("TEF analysis cleared");
    }

    fn countdown(&mut self, remaining: Option<u32>) {
        tracing::trace!(?remaining, "Analysis countdown");
    }
}
