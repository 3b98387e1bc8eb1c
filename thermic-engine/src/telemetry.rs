//! Tracing subscriber setup for binaries and tests.
//!
//! Libraries in this workspace only emit events; installing a subscriber is
//! the host's call.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "thermic_core=info,thermic_storage=info,thermic_llm=info,thermic_engine=info";

/// Output format for [`init_tracing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `THERMIC_LOG_FORMAT` (`json` or anything else for pretty).
    pub fn from_env() -> Self {
        std::env::var("THERMIC_LOG_FORMAT")
            .ok()
            .map(|s| Self::parse(&s))
            .unwrap_or_default()
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Install a global subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`]. Fails if one is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    tracing::info!(?format, "Tracing initialized");
    Ok(())
}
