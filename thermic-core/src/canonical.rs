//! Canonical projection and content-addressed cache keys.
//!
//! A meal list is projected onto the fields that matter for analysis
//! (name, grams, meal type and the four tracked macros), normalized, sorted
//! and serialized with a fixed field order. The SHA-256 of that form is the
//! cache key. Volatile fields (id, timestamp, period, estimation flag,
//! micronutrients) never reach the projection, so edits to them cannot
//! change the key.

use crate::constants::CACHE_KEY_PREFIX;
use crate::{compute_content_hash, round2, MealEntry, MealType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// CACHE KEY
// ============================================================================

/// Content-addressed fingerprint of a meal list.
///
/// The empty key stands for "no entries": nothing is cached or scheduled
/// under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// The distinguished key for an empty meal list.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Wrap an already computed key (e.g. one read back from a snapshot).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// True for the empty-list key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// PROJECTION
// ============================================================================

/// The identity-relevant view of a meal entry.
///
/// This is also the shape sent to the external classifier, so it derives
/// `Serialize` with camelCase names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedEntry {
    pub name: String,
    pub grams: f64,
    pub meal_type: MealType,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl ProjectedEntry {
    /// Project and normalize a single entry.
    pub fn from_entry(entry: &MealEntry) -> Self {
        Self {
            name: entry.name.trim().to_lowercase(),
            grams: round2(entry.grams()),
            meal_type: entry.meal_type,
            calories: round2(entry.macros.calories()),
            protein: round2(entry.macros.protein()),
            carbs: round2(entry.macros.carbs()),
            fat: round2(entry.macros.fat()),
        }
    }

    /// Fixed-field-order JSON value for this projection.
    fn to_canonical_value(&self) -> Value {
        json!([
            self.name,
            self.grams,
            self.meal_type.as_str(),
            self.calories,
            self.protein,
            self.carbs,
            self.fat,
        ])
    }

    /// Sort order: name, then grams. Remaining fields break ties so equal
    /// (name, grams) pairs still sort the same way regardless of input order.
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.grams.total_cmp(&other.grams))
            .then_with(|| self.meal_type.cmp(&other.meal_type))
            .then_with(|| self.calories.total_cmp(&other.calories))
            .then_with(|| self.protein.total_cmp(&other.protein))
            .then_with(|| self.carbs.total_cmp(&other.carbs))
            .then_with(|| self.fat.total_cmp(&other.fat))
    }
}

/// Project every entry and sort the projections canonically.
pub fn project(entries: &[MealEntry]) -> Vec<ProjectedEntry> {
    let mut projected: Vec<ProjectedEntry> = entries.iter().map(ProjectedEntry::from_entry).collect();
    projected.sort_by(|a, b| a.canonical_cmp(b));
    projected
}

/// The canonical string form of a meal list. Empty for an empty list.
pub fn canonical_form(entries: &[MealEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let values: Vec<Value> = project(entries)
        .iter()
        .map(ProjectedEntry::to_canonical_value)
        .collect();
    Value::Array(values).to_string()
}

/// Compute the cache key for a meal list.
pub fn hash(entries: &[MealEntry]) -> CacheKey {
    if entries.is_empty() {
        return CacheKey::empty();
    }
    let form = canonical_form(entries);
    let digest = compute_content_hash(form.as_bytes());
    let key = CacheKey(format!("{}{}", CACHE_KEY_PREFIX, hex::encode(digest)));
    tracing::trace!(entries = entries.len(), key = %key, "Computed cache key");
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Macros;
    use chrono::Utc;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn coffee() -> MealEntry {
        MealEntry::new(
            "Coffee",
            200.0,
            MealType::Breakfast,
            Macros::new(4.0, 0.6, 0.0, 0.0),
        )
    }

    fn oats() -> MealEntry {
        MealEntry::new(
            "Oats",
            80.0,
            MealType::Breakfast,
            Macros::new(300.0, 10.0, 54.0, 5.0),
        )
    }

    #[test]
    fn test_empty_list_maps_to_empty_key() {
        let key = hash(&[]);
        assert!(key.is_empty());
        assert_eq!(key, CacheKey::empty());
        assert_eq!(canonical_form(&[]), "");
    }

    #[test]
    fn test_key_has_prefix_and_hex_digest() {
        let key = hash(&[coffee()]);
        assert!(key.as_str().starts_with(CACHE_KEY_PREFIX));
        assert_eq!(key.as_str().len(), CACHE_KEY_PREFIX.len() + 64);
    }

    #[test]
    fn test_name_is_trimmed_and_lowercased() {
        let mut shouty = coffee();
        shouty.name = "  COFFEE ".to_string();
        assert_eq!(hash(&[shouty]), hash(&[coffee()]));
    }

    #[test]
    fn test_rounding_below_two_decimals_is_ignored() {
        let mut nudged = coffee();
        nudged.consumed_grams = Some(200.001);
        nudged.macros.protein = Some(0.6004);
        assert_eq!(hash(&[nudged]), hash(&[coffee()]));
    }

    #[test]
    fn test_volatile_fields_excluded() {
        let mut noisy = coffee()
            .with_id(Uuid::now_v7())
            .with_timestamp(Utc::now())
            .estimated();
        noisy.period = Some(crate::DayPeriod::Morning);
        noisy.micronutrients.insert("caffeine_mg".to_string(), 95.0);
        assert_eq!(hash(&[noisy]), hash(&[coffee()]));
    }

    #[test]
    fn test_missing_macro_equals_zero_macro() {
        let mut sparse = coffee();
        sparse.macros.carbs = None;
        assert_eq!(hash(&[sparse]), hash(&[coffee()]));
    }

    #[test]
    fn test_meal_type_changes_key() {
        let mut moved = coffee();
        moved.meal_type = MealType::Snack;
        assert_ne!(hash(&[moved]), hash(&[coffee()]));
    }

    #[test]
    fn test_canonical_form_is_sorted_by_name() {
        let form = canonical_form(&[oats(), coffee()]);
        let coffee_at = form.find("coffee").unwrap();
        let oats_at = form.find("oats").unwrap();
        assert!(coffee_at < oats_at);
    }

    #[test]
    fn test_duplicate_names_sort_by_grams_then_rest() {
        let small = MealEntry::new("egg", 50.0, MealType::Lunch, Macros::new(70.0, 6.0, 0.5, 5.0));
        let large = MealEntry::new("egg", 60.0, MealType::Lunch, Macros::new(84.0, 7.0, 0.6, 6.0));
        let same_grams = MealEntry::new("egg", 50.0, MealType::Dinner, Macros::new(70.0, 6.0, 0.5, 5.0));
        let a = hash(&[small.clone(), large.clone(), same_grams.clone()]);
        let b = hash(&[same_grams, large, small]);
        assert_eq!(a, b);
    }

    fn arb_entry() -> impl Strategy<Value = MealEntry> {
        (
            prop::sample::select(vec!["coffee", "oats", "chili", "egg", "rice"]),
            0.0f64..500.0,
            prop::sample::select(vec![
                MealType::Breakfast,
                MealType::Lunch,
                MealType::Dinner,
                MealType::Snack,
            ]),
            (0.0f64..900.0, 0.0f64..60.0, 0.0f64..120.0, 0.0f64..60.0),
        )
            .prop_map(|(name, grams, meal_type, (cal, p, c, f))| {
                MealEntry::new(name, grams, meal_type, Macros::new(cal, p, c, f))
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Property: reversing or rotating the list never changes the key.
        #[test]
        fn prop_order_invariance(
            entries in prop::collection::vec(arb_entry(), 0..8),
            rotate in 0usize..8,
        ) {
            let mut reversed = entries.clone();
            reversed.reverse();
            prop_assert_eq!(hash(&entries), hash(&reversed));

            if !entries.is_empty() {
                let mut rotated = entries.clone();
                let by = rotate % rotated.len();
                rotated.rotate_left(by);
                prop_assert_eq!(hash(&entries), hash(&rotated));
            }
        }

        /// Property: changing a tracked macro by a full hundredth changes the key.
        #[test]
        fn prop_macro_change_changes_key(
            entries in prop::collection::vec(arb_entry(), 1..6),
            delta in 1u32..1000,
        ) {
            let mut changed = entries.clone();
            let bump = delta as f64 / 100.0;
            changed[0].macros.fat = Some(changed[0].macros.fat() + bump + 0.01);
            prop_assert_ne!(hash(&entries), hash(&changed));
        }
    }
}
