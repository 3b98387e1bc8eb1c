//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thermic_core::{Clock, TefAnalysis, ThermicConfig};
use thermic_engine::{AnalysisSink, TefService};
use thermic_llm::{ClassificationClient, ClassificationProvider};
use thermic_storage::{InMemorySnapshotStore, SnapshotStore};

/// What the event loop told the sink, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Applied(TefAnalysis),
    Cleared,
    Countdown(Option<u32>),
}

/// Sink that records every call for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn applied(&self) -> Vec<TefAnalysis> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Applied(analysis) => Some(analysis),
                _ => None,
            })
            .collect()
    }

    pub fn cleared_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Cleared))
            .count()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl AnalysisSink for RecordingSink {
    fn apply(&mut self, analysis: &TefAnalysis) {
        self.push(SinkEvent::Applied(analysis.clone()));
    }

    fn clear(&mut self) {
        self.push(SinkEvent::Cleared);
    }

    fn countdown(&mut self, remaining: Option<u32>) {
        self.push(SinkEvent::Countdown(remaining));
    }
}

/// Service over an in-memory backend with an optional provider.
pub fn service_with(
    clock: Arc<dyn Clock>,
    provider: Option<Arc<dyn ClassificationProvider>>,
) -> TefService {
    let config = ThermicConfig::default();
    let client = ClassificationClient::from_config(provider, &config);
    TefService::new(
        config,
        Arc::new(InMemorySnapshotStore::new()) as Arc<dyn SnapshotStore>,
        clock,
        client,
    )
}

/// Service with a hand-built config, in-memory backend and no provider.
pub fn service_with_config(config: ThermicConfig, clock: Arc<dyn Clock>) -> TefService {
    TefService::new(
        config,
        Arc::new(InMemorySnapshotStore::new()) as Arc<dyn SnapshotStore>,
        clock,
        ClassificationClient::disabled(),
    )
}

/// Service over `backend` with no provider.
pub fn service_on(backend: Arc<dyn SnapshotStore>, clock: Arc<dyn Clock>) -> TefService {
    TefService::new(
        ThermicConfig::default(),
        backend,
        clock,
        ClassificationClient::disabled(),
    )
}

pub const QUIET: Duration = Duration::from_secs(15);
