//! Time-decay estimate of currently active TEF.
//!
//! Query-time only. Nothing here feeds the cache key or the cached analysis.

use crate::constants::{DECAY_HALF_LIFE_HOURS, DECAY_PEAK_HOURS, DECAY_WINDOW_HOURS};
use crate::tef::entry_tef;
use crate::{MealEntry, Timestamp};
use chrono::Duration;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Decay factor for `hours` elapsed since consumption.
///
/// Linear ramp to 1.0 at the peak, then exponential decay with the
/// configured half-life. Zero outside `[0, window]`.
pub fn decay_factor(hours: f64) -> f64 {
    if !hours.is_finite() || hours < 0.0 || hours > DECAY_WINDOW_HOURS {
        return 0.0;
    }
    if hours <= DECAY_PEAK_HOURS {
        hours / DECAY_PEAK_HOURS
    } else {
        2f64.powf(-(hours - DECAY_PEAK_HOURS) / DECAY_HALF_LIFE_HOURS)
    }
}

/// Decay factor between a consumption time and a query time.
pub fn decay_factor_at(consumed_at: Timestamp, query: Timestamp) -> f64 {
    let elapsed = query.signed_duration_since(consumed_at);
    decay_factor(elapsed.num_milliseconds() as f64 / MILLIS_PER_HOUR)
}

/// TEF still active at `query`, kcal. Entries without a timestamp add nothing.
pub fn current_tef(entries: &[MealEntry], query: Timestamp) -> f64 {
    entries
        .iter()
        .filter_map(|entry| {
            entry
                .timestamp
                .map(|consumed_at| entry_tef(entry) * decay_factor_at(consumed_at, query))
        })
        .sum()
}

/// Sample [`current_tef`] from `from` to `to` inclusive every `step`.
///
/// Returns an empty curve for a non-positive step or an inverted window.
pub fn active_tef_curve(
    entries: &[MealEntry],
    from: Timestamp,
    to: Timestamp,
    step: Duration,
) -> Vec<(Timestamp, f64)> {
    if step <= Duration::zero() || to < from {
        return Vec::new();
    }

    let mut curve = Vec::new();
    let mut at = from;
    while at <= to {
        curve.push((at, current_tef(entries, at)));
        at += step;
    }
    curve
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Macros, MealType};
    use chrono::TimeZone;
    use chrono::Utc;
    use proptest::prelude::*;

    fn noon() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn bowl_at(at: Timestamp) -> MealEntry {
        // 37.8 kcal of TEF
        MealEntry::new(
            "Chicken rice bowl",
            350.0,
            MealType::Lunch,
            Macros::new(370.0, 20.0, 50.0, 10.0),
        )
        .with_timestamp(at)
    }

    #[test]
    fn test_factor_shape() {
        assert_eq!(decay_factor(-0.1), 0.0);
        assert_eq!(decay_factor(0.0), 0.0);
        assert!((decay_factor(0.75) - 0.5).abs() < 1e-12);
        assert!((decay_factor(1.5) - 1.0).abs() < 1e-12);
        assert!((decay_factor(3.5) - 0.5).abs() < 1e-12);
        assert!((decay_factor(5.5) - 0.25).abs() < 1e-12);
        assert!(decay_factor(6.0) > 0.0);
        assert_eq!(decay_factor(6.01), 0.0);
        assert_eq!(decay_factor(f64::NAN), 0.0);
    }

    #[test]
    fn test_current_tef_at_peak() {
        let eaten = noon();
        let query = eaten + Duration::minutes(90);
        assert!((current_tef(&[bowl_at(eaten)], query) - 37.8).abs() < 1e-9);
    }

    #[test]
    fn test_future_and_untimed_entries_contribute_nothing() {
        let query = noon();
        let future = bowl_at(query + Duration::hours(1));
        let untimed = MealEntry::new("Apple", 150.0, MealType::Snack, Macros::new(80.0, 0.4, 21.0, 0.3));
        assert_eq!(current_tef(&[future, untimed], query), 0.0);
    }

    #[test]
    fn test_curve_samples_inclusive_window() {
        let eaten = noon();
        let curve = active_tef_curve(
            &[bowl_at(eaten)],
            eaten,
            eaten + Duration::hours(6),
            Duration::minutes(30),
        );
        assert_eq!(curve.len(), 13);
        assert_eq!(curve[0].1, 0.0);
        assert!((curve[3].1 - 37.8).abs() < 1e-9);
        assert!(curve[12].1 < curve[3].1);
    }

    #[test]
    fn test_curve_rejects_bad_step() {
        let eaten = noon();
        assert!(active_tef_curve(&[], eaten, eaten + Duration::hours(1), Duration::zero()).is_empty());
        assert!(active_tef_curve(&[], eaten + Duration::hours(1), eaten, Duration::minutes(1)).is_empty());
    }

    proptest! {
        /// Property: the factor is always within [0, 1].
        #[test]
        fn prop_factor_bounded(hours in -10.0f64..20.0) {
            let f = decay_factor(hours);
            prop_assert!((0.0..=1.0).contains(&f));
        }
    }
}
