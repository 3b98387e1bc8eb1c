//! THERMIC Engine - Scheduling and Orchestration
//!
//! - [`DebounceScheduler`]: Idle/Armed state machine that coalesces meal-list
//!   mutations into one deferred analysis
//! - [`AnalysisOrchestrator`]: cache lookup, local estimate, optional
//!   external opinion, merge and cache write
//! - [`TefService`]: the public facade over both, plus the cache
//! - [`run_event_loop`]: tokio driver with real timers
//!
//! # Example
//!
//! ```ignore
//! use thermic_engine::{run_event_loop, MealEvent, TefService, TracingSink};
//! use thermic_core::ThermicConfig;
//! use tokio::sync::mpsc;
//!
//! let (tx, rx) = mpsc::channel(32);
//! let service = TefService::local(ThermicConfig::from_env());
//! let handle = tokio::spawn(run_event_loop(service, rx, TracingSink));
//!
//! tx.send(MealEvent::Entries(todays_entries)).await?;
//! // ...
//! tx.send(MealEvent::Shutdown).await?;
//! let service = handle.await?;
//! ```

pub mod driver;
pub mod orchestrator;
pub mod scheduler;
pub mod service;
pub mod sink;
pub mod telemetry;

pub use driver::{run_event_loop, MealEvent, TokioClock};
pub use orchestrator::{AnalysisOrchestrator, Begin, Dispatch, Resolved};
pub use scheduler::{DebounceScheduler, DebounceState, MutationOutcome};
pub use service::{Completed, TefService};
pub use sink::{AnalysisSink, TracingSink};
pub use telemetry::{init_tracing, LogFormat, DEFAULT_LOG_FILTER};
