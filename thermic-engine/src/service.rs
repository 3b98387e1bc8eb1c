//! Public facade over cache, scheduler and orchestrator.
//!
//! A [`TefService`] tracks one day's meal list. Hosts either drive it by
//! hand (`set_entries`, `poll_due`, `complete`) or hand it to
//! [`crate::run_event_loop`].

use std::sync::Arc;

use chrono::Duration;
use thermic_core::{
    active_tef_curve, current_tef, CacheKey, Clock, MealEntry, SystemClock, TefAnalysis,
    ThermicConfig, Timestamp,
};
use thermic_llm::ClassificationClient;
use thermic_storage::{CacheStats, CacheStore, InMemorySnapshotStore, SnapshotStore};

use crate::orchestrator::{AnalysisOrchestrator, Begin, Resolved};
use crate::scheduler::{DebounceScheduler, MutationOutcome};

/// Outcome of merging a resolved external call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    pub analysis: TefAnalysis,
    /// Whether the result describes the current meal list. A late result
    /// for an older list is cached but not applied.
    pub applied: bool,
}

/// TEF analysis service for a single meal list.
#[derive(Debug)]
pub struct TefService {
    config: ThermicConfig,
    cache: CacheStore,
    scheduler: DebounceScheduler,
    orchestrator: AnalysisOrchestrator,
    entries: Vec<MealEntry>,
    current: Option<TefAnalysis>,
}

impl TefService {
    pub fn new(
        config: ThermicConfig,
        backend: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        client: ClassificationClient,
    ) -> Self {
        let cache = CacheStore::new(backend, clock, &config);
        let scheduler = DebounceScheduler::new(&config);
        Self {
            config,
            cache,
            scheduler,
            orchestrator: AnalysisOrchestrator::new(client),
            entries: Vec::new(),
            current: None,
        }
    }

    /// In-memory cache, wall clock, no external classifier.
    pub fn local(config: ThermicConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(SystemClock),
            ClassificationClient::disabled(),
        )
    }

    pub fn config(&self) -> &ThermicConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.cache.now()
    }

    /// Whether an external classifier is configured.
    pub fn has_classifier(&self) -> bool {
        self.orchestrator.client().is_enabled()
    }

    // ========================================================================
    // Cache surface
    // ========================================================================

    /// Cache key for a meal list.
    pub fn hash(entries: &[MealEntry]) -> CacheKey {
        thermic_core::hash(entries)
    }

    pub fn get_cached_analysis(&mut self, entries: &[MealEntry]) -> Option<TefAnalysis> {
        self.cache.get(entries)
    }

    pub fn set_cached_analysis(&mut self, entries: &[MealEntry], analysis: TefAnalysis) {
        self.cache.set(entries, analysis);
    }

    /// True iff the list is non-empty, its key differs from
    /// `previous_hash`, and no valid analysis is cached for it.
    pub fn should_schedule(&mut self, entries: &[MealEntry], previous_hash: &CacheKey) -> bool {
        let key = Self::hash(entries);
        !key.is_empty() && &key != previous_hash && !self.cache.contains_valid(&key)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&mut self) -> CacheStats {
        self.cache.stats()
    }

    /// Local analysis with an optional multiplier override. Not cached.
    pub fn compute_analysis(&self, entries: &[MealEntry], multiplier: Option<f64>) -> TefAnalysis {
        thermic_core::compute_analysis(entries, multiplier, self.now())
    }

    // ========================================================================
    // Meal list and scheduling
    // ========================================================================

    pub fn current_entries(&self) -> &[MealEntry] {
        &self.entries
    }

    /// The analysis currently describing the meal list, if any.
    pub fn current_analysis(&self) -> Option<&TefAnalysis> {
        self.current.as_ref()
    }

    pub fn scheduler(&self) -> &DebounceScheduler {
        &self.scheduler
    }

    /// Replace the meal list and let the scheduler react.
    pub fn set_entries(&mut self, entries: Vec<MealEntry>) -> MutationOutcome {
        self.entries = entries;
        let now = self.now();
        let outcome = self
            .scheduler
            .on_mutation(&self.entries, &mut self.cache, now);

        match &outcome {
            MutationOutcome::CacheHit(analysis) => self.current = Some(analysis.clone()),
            MutationOutcome::Cleared => self.current = None,
            MutationOutcome::Armed { .. } | MutationOutcome::Unchanged => {}
        }
        outcome
    }

    /// If the quiet period is over, start an analysis of the entries as they
    /// stand now.
    pub fn poll_due(&mut self) -> Option<Begin> {
        let now = self.now();
        self.scheduler.poll(now)?;

        let begin = self.orchestrator.begin(&self.entries, &mut self.cache);
        if let Begin::Cached(analysis) = &begin {
            self.current = Some(analysis.clone());
        }
        Some(begin)
    }

    /// Merge a resolved call. Cached under its dispatch-time key either way.
    pub fn complete(&mut self, resolved: Resolved) -> Completed {
        let applied = resolved.key == Self::hash(&self.entries);
        let analysis = self.orchestrator.complete(resolved, &mut self.cache);
        if applied {
            self.current = Some(analysis.clone());
        }
        Completed { analysis, applied }
    }

    /// Skip the quiet period and analyze now.
    pub async fn analyze_now(&mut self) -> Option<TefAnalysis> {
        self.scheduler.disarm();
        let analysis = self.orchestrator.run(&self.entries, &mut self.cache).await;
        self.current = analysis.clone();
        analysis
    }

    /// Remaining countdown ticks, `None` when nothing is scheduled.
    pub fn countdown(&self) -> Option<u32> {
        self.scheduler.countdown(self.now())
    }

    /// Advance the displayed countdown.
    pub fn tick(&mut self) -> Option<u32> {
        let now = self.now();
        self.scheduler.tick(now)
    }

    pub fn time_until_fire(&self) -> Option<std::time::Duration> {
        self.scheduler.time_until_fire(self.now())
    }

    // ========================================================================
    // Decay
    // ========================================================================

    /// TEF still active right now for the current list, kcal.
    pub fn active_tef(&self) -> f64 {
        current_tef(&self.entries, self.now())
    }

    /// Active TEF sampled over a window for the current list.
    pub fn active_tef_curve(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: Duration,
    ) -> Vec<(Timestamp, f64)> {
        active_tef_curve(&self.entries, from, to, step)
    }
}
