//! Async event loop driving a [`TefService`].
//!
//! One task owns the service. Meal-list changes arrive over an mpsc channel,
//! a tokio interval drives the countdown display, and a sleep until the
//! debounce deadline fires the analysis. At most one external call is in
//! flight; a fire that happens meanwhile is queued (latest wins). In-flight
//! calls are never cancelled, and their results are cached under the key
//! captured at dispatch time.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use thermic_core::{Clock, MealEntry, Timestamp};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::orchestrator::{Begin, Dispatch, Resolved};
use crate::scheduler::MutationOutcome;
use crate::service::TefService;
use crate::sink::AnalysisSink;

type InFlight = Pin<Box<dyn Future<Output = Resolved> + Send>>;

const MIN_TICK: Duration = Duration::from_millis(1);

/// Input to the event loop.
#[derive(Debug, Clone)]
pub enum MealEvent {
    /// The meal list now reads like this.
    Entries(Vec<MealEntry>),
    /// Drop every cached analysis.
    ClearCache,
    /// Finish any in-flight call and stop.
    Shutdown,
}

/// A clock that follows tokio's timer, so paused-time tests move it too.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: Instant,
    origin_ts: Timestamp,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(origin_ts: Timestamp) -> Self {
        Self {
            origin: Instant::now(),
            origin_ts,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        let elapsed = Instant::now().saturating_duration_since(self.origin);
        let elapsed = chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_ts + elapsed
    }
}

/// Run until the channel closes or [`MealEvent::Shutdown`] arrives.
/// Returns the service for inspection.
pub async fn run_event_loop<S: AnalysisSink>(
    mut service: TefService,
    mut events: mpsc::Receiver<MealEvent>,
    mut sink: S,
) -> TefService {
    // A hand-built config may skip validation; interval() rejects zero.
    let mut ticker = interval(service.config().tick_interval.max(MIN_TICK));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Option<InFlight> = None;
    let mut queued: Option<Dispatch> = None;

    info!(
        quiet_period_ms = service.config().quiet_period.as_millis() as u64,
        classifier = service.has_classifier(),
        "TEF event loop started"
    );

    loop {
        let fire_in = service.time_until_fire();

        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(MealEvent::Entries(entries)) => {
                        handle_mutation(&mut service, entries, &mut sink);
                    }
                    Some(MealEvent::ClearCache) => service.clear_cache(),
                    Some(MealEvent::Shutdown) | None => break,
                }
            }

            _ = ticker.tick() => {
                if service.scheduler().is_armed() {
                    sink.countdown(service.tick());
                }
            }

            _ = sleep(fire_in.unwrap_or(Duration::ZERO)), if fire_in.is_some() => {
                if let Some(begin) = service.poll_due() {
                    match begin {
                        Begin::Cached(analysis) => sink.apply(&analysis),
                        Begin::Empty => sink.clear(),
                        Begin::Dispatch(dispatch) => {
                            if in_flight.is_none() {
                                in_flight = Some(Box::pin(dispatch.resolve()));
                            } else {
                                debug!(key = %dispatch.key(), "Call in flight, queueing dispatch");
                                queued = Some(dispatch);
                            }
                        }
                    }
                    sink.countdown(None);
                }
            }

            resolved = wait_in_flight(&mut in_flight) => {
                deliver(&mut service, resolved, &mut sink);
                in_flight = start_queued(&mut service, &mut queued, &mut sink);
            }
        }
    }

    // Never cancel: drain what was already dispatched.
    while let Some(call) = in_flight.take() {
        let resolved = call.await;
        deliver(&mut service, resolved, &mut sink);
        in_flight = start_queued(&mut service, &mut queued, &mut sink);
    }

    info!("TEF event loop stopped");
    service
}

fn handle_mutation<S: AnalysisSink>(
    service: &mut TefService,
    entries: Vec<MealEntry>,
    sink: &mut S,
) {
    match service.set_entries(entries) {
        MutationOutcome::CacheHit(analysis) => {
            sink.apply(&analysis);
            sink.countdown(None);
        }
        MutationOutcome::Cleared => {
            sink.clear();
            sink.countdown(None);
        }
        MutationOutcome::Armed { .. } => sink.countdown(service.countdown()),
        MutationOutcome::Unchanged => {}
    }
}

fn deliver<S: AnalysisSink>(service: &mut TefService, resolved: Resolved, sink: &mut S) {
    let completed = service.complete(resolved);
    if completed.applied {
        sink.apply(&completed.analysis);
    } else {
        debug!("Late analysis cached for a list that has since changed");
    }
}

/// Start the queued dispatch unless its list got cached in the meantime.
fn start_queued<S: AnalysisSink>(
    service: &mut TefService,
    queued: &mut Option<Dispatch>,
    sink: &mut S,
) -> Option<InFlight> {
    let dispatch = queued.take()?;
    if let Some(analysis) = service.get_cached_analysis(dispatch.entries()) {
        if TefService::hash(service.current_entries()) == *dispatch.key() {
            sink.apply(&analysis);
        }
        return None;
    }
    Some(Box::pin(dispatch.resolve()))
}

async fn wait_in_flight(slot: &mut Option<InFlight>) -> Resolved {
    match slot.as_mut() {
        Some(call) => call.await,
        None => std::future::pending().await,
    }
}
