//! Debounce scheduler.
//!
//! Coalesces bursts of meal-list mutations into a single deferred analysis.
//! Purely a state machine: it owns no timer. Callers pass the current
//! instant to [`DebounceScheduler::on_mutation`], [`DebounceScheduler::poll`]
//! and [`DebounceScheduler::tick`]; the event loop in [`crate::driver`]
//! supplies real timers.
//!
//! ```text
//!            mutation (new hash, cache miss)
//!   Idle ──────────────────────────────────────▶ Armed
//!    ▲  ◀── cache hit / empty list / fire ───────  │
//!    │                                             │ mutation (new hash, miss)
//!    │                                             └──▶ Armed (deadline reset)
//! ```

use chrono::Duration;
use thermic_core::{hash, CacheKey, MealEntry, TefAnalysis, ThermicConfig, Timestamp};
use thermic_storage::CacheStore;
use tracing::debug;

/// Scheduler state.
#[derive(Debug, Clone, PartialEq)]
pub enum DebounceState {
    Idle,
    Armed {
        /// Cache key of the list that armed the timer.
        hash: CacheKey,
        /// When the quiet period ends.
        deadline: Timestamp,
        /// Last displayed countdown value, in ticks.
        countdown: u32,
    },
}

/// What a mutation did to the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// Same hash as the armed one: nothing changed.
    Unchanged,
    /// A valid cached analysis exists; apply it. Scheduler is Idle.
    CacheHit(TefAnalysis),
    /// Timer (re)armed for a new hash.
    Armed { hash: CacheKey, deadline: Timestamp },
    /// List became empty: any stored analysis should be cleared.
    Cleared,
}

/// Idle/Armed debounce state machine.
#[derive(Debug, Clone)]
pub struct DebounceScheduler {
    state: DebounceState,
    quiet_period: Duration,
    tick_interval: Duration,
    initial_countdown: u32,
}

impl DebounceScheduler {
    pub fn new(config: &ThermicConfig) -> Self {
        let quiet_period =
            Duration::from_std(config.quiet_period).unwrap_or_else(|_| Duration::seconds(15));
        let tick_interval =
            Duration::from_std(config.tick_interval).unwrap_or_else(|_| Duration::seconds(1));
        Self {
            state: DebounceState::Idle,
            quiet_period,
            tick_interval,
            initial_countdown: config.countdown_ticks(),
        }
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, DebounceState::Armed { .. })
    }

    pub fn armed_hash(&self) -> Option<&CacheKey> {
        match &self.state {
            DebounceState::Armed { hash, .. } => Some(hash),
            DebounceState::Idle => None,
        }
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        match &self.state {
            DebounceState::Armed { deadline, .. } => Some(*deadline),
            DebounceState::Idle => None,
        }
    }

    /// React to the meal list changing to `entries`.
    pub fn on_mutation(
        &mut self,
        entries: &[MealEntry],
        cache: &mut CacheStore,
        now: Timestamp,
    ) -> MutationOutcome {
        if entries.is_empty() {
            self.disarm();
            debug!(transition = "cleared", "Meal list empty");
            return MutationOutcome::Cleared;
        }

        let new_hash = hash(entries);
        if self.armed_hash() == Some(&new_hash) {
            debug!(transition = "unchanged", key = %new_hash, "Mutation kept the armed hash");
            return MutationOutcome::Unchanged;
        }

        if let Some(analysis) = cache.get_by_key(&new_hash) {
            self.disarm();
            debug!(transition = "cache_hit", key = %new_hash, "Applying cached analysis");
            return MutationOutcome::CacheHit(analysis);
        }

        let deadline = now + self.quiet_period;
        debug!(
            transition = "armed",
            key = %new_hash,
            quiet_ms = self.quiet_period.num_milliseconds(),
            "Debounce armed"
        );
        self.state = DebounceState::Armed {
            hash: new_hash.clone(),
            deadline,
            countdown: self.initial_countdown,
        };
        MutationOutcome::Armed {
            hash: new_hash,
            deadline,
        }
    }

    /// Fire if the quiet period is over. Returns the armed hash and returns
    /// to Idle; otherwise `None`.
    pub fn poll(&mut self, now: Timestamp) -> Option<CacheKey> {
        let due = matches!(&self.state, DebounceState::Armed { deadline, .. } if now >= *deadline);
        if !due {
            return None;
        }
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Armed { hash, .. } => {
                debug!(transition = "fired", key = %hash, "Debounce fired");
                Some(hash)
            }
            DebounceState::Idle => None,
        }
    }

    /// Remaining whole ticks before firing, or `None` when Idle.
    pub fn countdown(&self, now: Timestamp) -> Option<u32> {
        let deadline = self.deadline()?;
        let remaining_ms = (deadline - now).num_milliseconds().max(0);
        let tick_ms = self.tick_interval.num_milliseconds().max(1);
        let ticks = (remaining_ms + tick_ms - 1) / tick_ms;
        Some(u32::try_from(ticks).unwrap_or(u32::MAX).min(self.initial_countdown))
    }

    /// Refresh the stored countdown from the clock and return it.
    pub fn tick(&mut self, now: Timestamp) -> Option<u32> {
        let remaining = self.countdown(now)?;
        if let DebounceState::Armed { countdown, .. } = &mut self.state {
            *countdown = remaining;
        }
        Some(remaining)
    }

    /// Time left until the deadline, zero if already due.
    pub fn time_until_fire(&self, now: Timestamp) -> Option<std::time::Duration> {
        let deadline = self.deadline()?;
        Some((deadline - now).to_std().unwrap_or_default())
    }

    /// Drop any pending fire.
    pub fn disarm(&mut self) {
        self.state = DebounceState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use std::sync::Arc;
    use thermic_core::{compute_analysis, Clock, Macros, ManualClock, MealType};
    use thermic_storage::InMemorySnapshotStore;

    fn start() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn coffee(grams: f64) -> MealEntry {
        MealEntry::new("Coffee", grams, MealType::Breakfast, Macros::new(4.0, 0.6, 0.0, 0.0))
    }

    fn setup() -> (DebounceScheduler, CacheStore, ManualClock) {
        let clock = ManualClock::new(start());
        let config = ThermicConfig::default();
        let cache = CacheStore::new(
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(clock.clone()),
            &config,
        );
        (DebounceScheduler::new(&config), cache, clock)
    }

    #[test]
    fn test_empty_list_never_arms() {
        let (mut scheduler, mut cache, clock) = setup();
        assert_eq!(
            scheduler.on_mutation(&[], &mut cache, clock.now()),
            MutationOutcome::Cleared
        );
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.poll(clock.now() + Duration::hours(1)), None);
    }

    #[test]
    fn test_arm_then_fire_after_quiet_period() {
        let (mut scheduler, mut cache, clock) = setup();
        let entries = [coffee(200.0)];
        let outcome = scheduler.on_mutation(&entries, &mut cache, clock.now());
        assert!(matches!(outcome, MutationOutcome::Armed { .. }));
        assert_eq!(scheduler.countdown(clock.now()), Some(15));

        assert_eq!(scheduler.poll(clock.now() + Duration::seconds(14)), None);
        assert_eq!(
            scheduler.poll(clock.now() + Duration::seconds(15)),
            Some(hash(&entries))
        );
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.poll(clock.now() + Duration::seconds(30)), None);
    }

    #[test]
    fn test_same_hash_does_not_reset_deadline() {
        let (mut scheduler, mut cache, clock) = setup();
        scheduler.on_mutation(&[coffee(200.0)], &mut cache, clock.now());
        let deadline = scheduler.deadline();

        let later = clock.now() + Duration::seconds(10);
        let relabelled = coffee(200.0).estimated();
        assert_eq!(
            scheduler.on_mutation(&[relabelled], &mut cache, later),
            MutationOutcome::Unchanged
        );
        assert_eq!(scheduler.deadline(), deadline);
    }

    #[test]
    fn test_new_hash_resets_deadline() {
        let (mut scheduler, mut cache, clock) = setup();
        scheduler.on_mutation(&[coffee(200.0)], &mut cache, clock.now());

        let later = clock.now() + Duration::seconds(10);
        scheduler.on_mutation(&[coffee(250.0)], &mut cache, later);
        assert_eq!(scheduler.deadline(), Some(later + Duration::seconds(15)));
        assert_eq!(scheduler.armed_hash(), Some(&hash(&[coffee(250.0)])));
    }

    #[test]
    fn test_cache_hit_disarms() {
        let (mut scheduler, mut cache, clock) = setup();
        let cached = [coffee(100.0)];
        let analysis = compute_analysis(&cached, None, clock.now());
        cache.set(&cached, analysis.clone());

        scheduler.on_mutation(&[coffee(200.0)], &mut cache, clock.now());
        assert!(scheduler.is_armed());

        let outcome = scheduler.on_mutation(&cached, &mut cache, clock.now());
        assert_eq!(outcome, MutationOutcome::CacheHit(analysis));
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_empty_list_disarms() {
        let (mut scheduler, mut cache, clock) = setup();
        scheduler.on_mutation(&[coffee(200.0)], &mut cache, clock.now());
        scheduler.on_mutation(&[], &mut cache, clock.now());
        assert_eq!(scheduler.state(), &DebounceState::Idle);
    }

    #[test]
    fn test_tick_counts_down() {
        let (mut scheduler, mut cache, clock) = setup();
        scheduler.on_mutation(&[coffee(200.0)], &mut cache, clock.now());

        assert_eq!(scheduler.tick(clock.now() + Duration::milliseconds(1_500)), Some(14));
        assert!(matches!(
            scheduler.state(),
            DebounceState::Armed { countdown: 14, .. }
        ));
        assert_eq!(scheduler.tick(clock.now() + Duration::seconds(20)), Some(0));
        assert_eq!(
            scheduler.time_until_fire(clock.now() + Duration::seconds(5)),
            Some(std::time::Duration::from_secs(10))
        );
    }

    proptest! {
        /// Property: mutations spaced closer than the quiet period never fire,
        /// and the burst fires exactly once after it goes quiet.
        #[test]
        fn prop_debounce_coalesces(gaps in prop::collection::vec(0i64..15_000, 1..30)) {
            let (mut scheduler, mut cache, clock) = setup();
            let mut now = clock.now();
            let mut fires = 0;

            for (i, gap) in gaps.iter().enumerate() {
                now += Duration::milliseconds(*gap);
                if scheduler.poll(now).is_some() {
                    fires += 1;
                }
                scheduler.on_mutation(&[coffee(100.0 + i as f64)], &mut cache, now);
            }
            prop_assert_eq!(fires, 0);

            now += Duration::seconds(15);
            if scheduler.poll(now).is_some() {
                fires += 1;
            }
            if scheduler.poll(now + Duration::seconds(60)).is_some() {
                fires += 1;
            }
            prop_assert_eq!(fires, 1);
        }
    }
}
