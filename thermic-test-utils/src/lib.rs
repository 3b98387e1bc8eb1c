//! THERMIC Test Utilities
//!
//! Centralized test infrastructure for the THERMIC workspace:
//! - Proptest generators for meal entries and lists
//! - Fixtures for the common meal scenarios and cache setups
//! - Custom assertions for THERMIC-specific validation

// Re-export mock providers from their source crate
pub use thermic_llm::{FailingClassificationProvider, MockClassificationProvider};

// Re-export core types for convenience
pub use thermic_core::{
    compute_analysis, hash, CacheKey, DayPeriod, EntryId, Macros, ManualClock, MealEntry,
    MealType, TefAnalysis, ThermicConfig, Timestamp,
};

use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating THERMIC types.

    use super::*;
    use proptest::prelude::*;

    /// Names that exercise both matching and non-matching classifier rules.
    pub const FOOD_NAMES: &[&str] = &[
        "Coffee",
        "Oats",
        "Chili con carne",
        "Green tea",
        "Chicken breast",
        "Rice",
        "Ginger shot",
        "Apple",
        "Steak",
        "Greek yogurt",
    ];

    /// Generate a random UUID (for volatile entry ids).
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-2030
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_meal_type() -> impl Strategy<Value = MealType> {
        prop_oneof![
            Just(MealType::Breakfast),
            Just(MealType::Lunch),
            Just(MealType::Dinner),
            Just(MealType::Snack),
        ]
    }

    pub fn arb_day_period() -> impl Strategy<Value = DayPeriod> {
        prop_oneof![
            Just(DayPeriod::Morning),
            Just(DayPeriod::Afternoon),
            Just(DayPeriod::Evening),
            Just(DayPeriod::Night),
        ]
    }

    /// Macros with values on a 2-decimal grid, so rounding never merges two
    /// generated values.
    pub fn arb_macros() -> impl Strategy<Value = Macros> {
        (0u32..90_000, 0u32..6_000, 0u32..12_000, 0u32..6_000).prop_map(|(cal, p, c, f)| {
            Macros::new(
                cal as f64 / 100.0,
                p as f64 / 100.0,
                c as f64 / 100.0,
                f as f64 / 100.0,
            )
        })
    }

    /// An entry with identity fields set and volatile fields empty.
    pub fn arb_meal_entry() -> impl Strategy<Value = MealEntry> {
        (
            prop::sample::select(FOOD_NAMES),
            0u32..100_000,
            arb_meal_type(),
            arb_macros(),
        )
            .prop_map(|(name, grams, meal_type, macros)| {
                MealEntry::new(name, grams as f64 / 100.0, meal_type, macros)
            })
    }

    pub fn arb_meal_list(max_len: usize) -> impl Strategy<Value = Vec<MealEntry>> {
        prop::collection::vec(arb_meal_entry(), 0..=max_len)
    }

    pub fn arb_non_empty_meal_list(max_len: usize) -> impl Strategy<Value = Vec<MealEntry>> {
        prop::collection::vec(arb_meal_entry(), 1..=max_len.max(1))
    }

    /// Random values for every volatile field of `entry`.
    pub fn arb_volatile_noise(entry: MealEntry) -> impl Strategy<Value = MealEntry> {
        (
            proptest::option::of(arb_uuid()),
            proptest::option::of(arb_timestamp()),
            proptest::option::of(arb_day_period()),
            any::<bool>(),
            prop::collection::btree_map("[a-z_]{1,12}", 0.0f64..500.0, 0..4),
        )
            .prop_map(move |(id, timestamp, period, is_estimated, micronutrients)| {
                let mut noisy = entry.clone();
                noisy.id = id;
                noisy.timestamp = timestamp;
                noisy.period = period;
                noisy.is_estimated = is_estimated;
                noisy.micronutrients = micronutrients;
                noisy
            })
    }

    /// Any finite multiplier an untrusted classifier might send.
    pub fn arb_external_multiplier() -> impl Strategy<Value = f64> {
        prop_oneof![
            -10.0f64..10.0,
            Just(0.0),
            Just(0.5),
            Just(5.0),
            Just(1e9),
        ]
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use thermic_storage::{CacheStore, InMemorySnapshotStore, SnapshotStore};

    /// A fixed start instant: 2024-03-01 08:00 UTC.
    pub fn start_time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// A manual clock at [`start_time`].
    pub fn manual_clock() -> ManualClock {
        ManualClock::new(start_time())
    }

    /// 200 g coffee, 4 kcal, 0.6 g protein.
    pub fn coffee() -> MealEntry {
        MealEntry::new(
            "Coffee",
            200.0,
            MealType::Breakfast,
            Macros::new(4.0, 0.6, 0.0, 0.0),
        )
    }

    pub fn oats() -> MealEntry {
        MealEntry::new(
            "Oats",
            80.0,
            MealType::Breakfast,
            Macros::new(300.0, 10.0, 54.0, 5.0),
        )
    }

    pub fn chili_con_carne() -> MealEntry {
        MealEntry::new(
            "Chili con carne",
            350.0,
            MealType::Dinner,
            Macros::new(420.0, 30.0, 35.0, 16.0),
        )
    }

    pub fn chicken_rice_bowl() -> MealEntry {
        MealEntry::new(
            "Chicken rice bowl",
            350.0,
            MealType::Lunch,
            Macros::new(370.0, 20.0, 50.0, 10.0),
        )
    }

    /// A typical breakfast.
    pub fn breakfast() -> Vec<MealEntry> {
        vec![coffee(), oats()]
    }

    /// `entry` with every volatile field filled in.
    pub fn with_volatile_fields(entry: MealEntry, at: Timestamp) -> MealEntry {
        let mut micronutrients = BTreeMap::new();
        micronutrients.insert("sodium_mg".to_string(), 5.0);
        let mut noisy = entry.with_id(Uuid::now_v7()).with_timestamp(at).estimated();
        noisy.period = Some(DayPeriod::Morning);
        noisy.micronutrients = micronutrients;
        noisy
    }

    /// A cache on a shared in-memory backend, driven by `clock`.
    pub fn memory_cache(clock: &ManualClock) -> (CacheStore, Arc<InMemorySnapshotStore>) {
        let backend = Arc::new(InMemorySnapshotStore::new());
        let store = CacheStore::new(
            backend.clone() as Arc<dyn SnapshotStore>,
            Arc::new(clock.clone()),
            &ThermicConfig::default(),
        );
        (store, backend)
    }

    /// A local analysis of `entries` at the clock's current instant.
    pub fn local_analysis(entries: &[MealEntry], clock: &ManualClock) -> TefAnalysis {
        use thermic_core::Clock;
        compute_analysis(entries, None, clock.now())
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for THERMIC-specific validation.

    use super::*;
    use thermic_core::constants::{MAX_ENHANCEMENT_MULTIPLIER, MIN_ENHANCEMENT_MULTIPLIER};

    /// Assert the multiplier lies in the allowed range.
    #[track_caller]
    pub fn assert_multiplier_bounded(analysis: &TefAnalysis) {
        let m = analysis.enhancement_multiplier;
        assert!(
            (MIN_ENHANCEMENT_MULTIPLIER..=MAX_ENHANCEMENT_MULTIPLIER).contains(&m),
            "multiplier {} outside [{}, {}]",
            m,
            MIN_ENHANCEMENT_MULTIPLIER,
            MAX_ENHANCEMENT_MULTIPLIER
        );
    }

    /// Assert `enhanced_tef` agrees with `base_tef * multiplier` to rounding.
    #[track_caller]
    pub fn assert_enhanced_consistent(analysis: &TefAnalysis) {
        let expected = analysis.base_tef * analysis.enhancement_multiplier;
        assert!(
            (analysis.enhanced_tef - expected).abs() <= 0.02,
            "enhanced_tef {} vs base {} x {}",
            analysis.enhanced_tef,
            analysis.base_tef,
            analysis.enhancement_multiplier
        );
    }

    /// Assert two lists share a cache key.
    #[track_caller]
    pub fn assert_same_key(a: &[MealEntry], b: &[MealEntry]) {
        assert_eq!(hash(a), hash(b), "expected equal cache keys");
    }

    /// Assert two lists have different cache keys.
    #[track_caller]
    pub fn assert_different_key(a: &[MealEntry], b: &[MealEntry]) {
        assert_ne!(hash(a), hash(b), "expected different cache keys");
    }

    /// Assert the factor labels contain no duplicates.
    #[track_caller]
    pub fn assert_distinct_factors(analysis: &TefAnalysis) {
        let mut seen = std::collections::HashSet::new();
        for factor in &analysis.enhancement_factors {
            assert!(seen.insert(factor), "duplicate factor {:?}", factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::*;
    use super::fixtures::*;
    use super::generators::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixtures_are_consistent() {
        let clock = manual_clock();
        let analysis = local_analysis(&breakfast(), &clock);
        assert_multiplier_bounded(&analysis);
        assert_enhanced_consistent(&analysis);
        assert_distinct_factors(&analysis);
        assert_same_key(&[coffee()], &[with_volatile_fields(coffee(), start_time())]);
        assert_different_key(&[coffee()], &[oats()]);
    }

    proptest! {
        #[test]
        fn prop_generated_noise_keeps_key(
            (entry, noisy) in arb_meal_entry()
                .prop_flat_map(|e| (Just(e.clone()), arb_volatile_noise(e)))
        ) {
            prop_assert_eq!(super::hash(&[entry]), super::hash(&[noisy]));
        }
    }
}
