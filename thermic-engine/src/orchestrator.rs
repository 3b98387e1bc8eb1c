//! Analysis orchestration.
//!
//! `run` is cache lookup, local estimate, optional external opinion, merge
//! and cache write. It is also available in two halves so an event loop can
//! keep the external call in flight while it keeps handling mutations:
//!
//! 1. [`AnalysisOrchestrator::begin`] checks the cache and, on a miss,
//!    snapshots the entries and their key into a [`Dispatch`].
//! 2. [`Dispatch::resolve`] performs the external call. It touches no
//!    shared state.
//! 3. [`AnalysisOrchestrator::complete`] merges and writes the result under
//!    the key captured at dispatch time.

use thermic_core::{
    hash, merge_analysis, project, CacheKey, ExternalOpinion, MealEntry, TefAnalysis,
};
use thermic_llm::ClassificationClient;
use thermic_storage::CacheStore;
use tracing::{debug, info};

/// Result of the synchronous first half.
#[derive(Debug)]
pub enum Begin {
    /// A valid cached analysis exists.
    Cached(TefAnalysis),
    /// Nothing to analyze.
    Empty,
    /// Cache miss; the external call is ready to go.
    Dispatch(Dispatch),
}

/// A classification request captured at dispatch time.
#[derive(Debug)]
pub struct Dispatch {
    key: CacheKey,
    entries: Vec<MealEntry>,
    client: ClassificationClient,
}

impl Dispatch {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn entries(&self) -> &[MealEntry] {
        &self.entries
    }

    /// Perform the external call. Never fails; "no opinion" is `None`.
    pub async fn resolve(self) -> Resolved {
        let opinion = if self.client.is_enabled() {
            self.client.classify(&project(&self.entries)).await
        } else {
            None
        };
        Resolved {
            key: self.key,
            entries: self.entries,
            opinion,
        }
    }
}

/// A finished external call, not yet merged.
#[derive(Debug)]
pub struct Resolved {
    pub key: CacheKey,
    pub entries: Vec<MealEntry>,
    pub opinion: Option<ExternalOpinion>,
}

/// Coordinates cache, local estimate and the external classifier.
#[derive(Debug, Clone)]
pub struct AnalysisOrchestrator {
    client: ClassificationClient,
}

impl AnalysisOrchestrator {
    pub fn new(client: ClassificationClient) -> Self {
        Self { client }
    }

    /// Local estimates only.
    pub fn local_only() -> Self {
        Self::new(ClassificationClient::disabled())
    }

    pub fn client(&self) -> &ClassificationClient {
        &self.client
    }

    /// Full analysis for `entries`. No retry on external failure.
    pub async fn run(&self, entries: &[MealEntry], cache: &mut CacheStore) -> Option<TefAnalysis> {
        match self.begin(entries, cache) {
            Begin::Cached(analysis) => Some(analysis),
            Begin::Empty => None,
            Begin::Dispatch(dispatch) => {
                let resolved = dispatch.resolve().await;
                Some(self.complete(resolved, cache))
            }
        }
    }

    /// Cache check and dispatch snapshot.
    pub fn begin(&self, entries: &[MealEntry], cache: &mut CacheStore) -> Begin {
        let key = hash(entries);
        if key.is_empty() {
            return Begin::Empty;
        }
        if let Some(analysis) = cache.get_by_key(&key) {
            debug!(key = %key, "Analysis served from cache");
            return Begin::Cached(analysis);
        }
        debug!(key = %key, entries = entries.len(), "Dispatching analysis");
        Begin::Dispatch(Dispatch {
            key,
            entries: entries.to_vec(),
            client: self.client.clone(),
        })
    }

    /// Merge a resolved call and cache it under its dispatch-time key.
    pub fn complete(&self, resolved: Resolved, cache: &mut CacheStore) -> TefAnalysis {
        let Resolved {
            key,
            entries,
            opinion,
        } = resolved;

        let analysis = merge_analysis(&entries, opinion, cache.now());
        info!(
            key = %key,
            source = analysis.source.as_str(),
            multiplier = analysis.enhancement_multiplier,
            enhanced_tef = analysis.enhanced_tef,
            "Analysis produced"
        );
        cache.set_by_key(key, analysis.clone());
        analysis
    }
}
