//! THERMIC Core - Types and Local Estimation
//!
//! Pure data structures and pure functions with no I/O. Every other crate
//! depends on this one:
//! - meal entries and their canonical projection / cache key
//! - baseline thermic effect from macronutrients
//! - keyword-based enhancement classification
//! - time-decay estimate of currently active TEF
//! - local analysis assembly and merge with an external opinion
//! - configuration, clock abstraction and the error hierarchy

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub mod analysis;
pub mod canonical;
pub mod clock;
pub mod config;
pub mod constants;
pub mod decay;
pub mod enhancement;
pub mod entry;
pub mod error;
pub mod tef;

pub use analysis::{
    clamp_multiplier, compute_analysis, merge_analysis, AnalysisSource, ExternalOpinion,
    TefAnalysis,
};
pub use canonical::{canonical_form, hash, project, CacheKey, ProjectedEntry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ThermicConfig;
pub use decay::{active_tef_curve, current_tef, decay_factor, decay_factor_at};
pub use enhancement::{classify, EnhancementCategory, EnhancementResult, ENHANCEMENT_RULES};
pub use entry::{DayPeriod, Macros, MealEntry, MealType, MealTypeParseError};
pub use error::{ClassificationError, ConfigError, StorageError, ThermicError, ThermicResult};
pub use tef::{base_tef, entry_tef, BaseTef};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Volatile identity of a meal entry (never part of the cache key).
pub type EntryId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Round to two decimal places, folding negative zero into zero.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_1), 1.24);
        assert_eq!(round2(200.0), 200.0);
        assert!(round2(-0.001).is_sign_positive());
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = compute_content_hash(b"coffee");
        let b = compute_content_hash(b"coffee");
        let c = compute_content_hash(b"tea");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
