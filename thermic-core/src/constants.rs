//! Constants for THERMIC
//!
//! Thermic coefficients, decay curve shape, multiplier bounds and scheduling
//! defaults. Centralized so tests and configuration share one source.

// ============================================================================
// MACRONUTRIENT ENERGY
// ============================================================================

/// Kilocalories per gram of protein.
pub const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;

/// Kilocalories per gram of carbohydrate.
pub const KCAL_PER_GRAM_CARBS: f64 = 4.0;

/// Kilocalories per gram of fat.
pub const KCAL_PER_GRAM_FAT: f64 = 9.0;

// ============================================================================
// THERMIC COEFFICIENTS
// ============================================================================

/// Fraction of protein energy spent on digestion.
pub const TEF_COEFFICIENT_PROTEIN: f64 = 0.25;

/// Fraction of carbohydrate energy spent on digestion.
pub const TEF_COEFFICIENT_CARBS: f64 = 0.08;

/// Fraction of fat energy spent on digestion.
pub const TEF_COEFFICIENT_FAT: f64 = 0.02;

// ============================================================================
// ENHANCEMENT MULTIPLIER
// ============================================================================

/// Lower bound for any enhancement multiplier (no enhancement).
pub const MIN_ENHANCEMENT_MULTIPLIER: f64 = 1.0;

/// Upper bound for any enhancement multiplier.
pub const MAX_ENHANCEMENT_MULTIPLIER: f64 = 1.3;

// ============================================================================
// DECAY MODEL
// ============================================================================

/// Hours after a meal at which TEF peaks.
pub const DECAY_PEAK_HOURS: f64 = 1.5;

/// Half-life of the post-peak decay, in hours.
pub const DECAY_HALF_LIFE_HOURS: f64 = 2.0;

/// Hours after which a meal no longer contributes.
pub const DECAY_WINDOW_HOURS: f64 = 6.0;

// ============================================================================
// CACHE & SCHEDULING DEFAULTS
// ============================================================================

/// Default cache record lifetime (24 hours).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;

/// Default quiet period before a scheduled analysis fires.
pub const DEFAULT_QUIET_PERIOD_SECS: u64 = 15;

/// Default countdown tick interval.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

/// Default bound on a single external classification call.
pub const DEFAULT_CLASSIFICATION_TIMEOUT_MS: u64 = 20_000;

/// Default persistence key for the cache snapshot.
pub const DEFAULT_SNAPSHOT_KEY: &str = "tef_analysis_cache";

/// Prefix for content-addressed cache keys. Bump the version when the
/// canonical projection changes.
pub const CACHE_KEY_PREFIX: &str = "tef:v1:";
