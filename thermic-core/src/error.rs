//! Error types for THERMIC operations

use thiserror::Error;

/// Snapshot persistence errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Backend {backend} failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("Snapshot under {key} is corrupted: {reason}")]
    Corrupted { key: String, reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// External classification errors.
///
/// These are always recovered locally; they exist so providers can report
/// what went wrong and the orchestrator can log it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("No classification provider configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Request to {provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },
}

/// Master error type for all THERMIC errors.
#[derive(Debug, Clone, Error)]
pub enum ThermicError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for THERMIC operations.
pub type ThermicResult<T> = Result<T, ThermicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_corrupted() {
        let err = StorageError::Corrupted {
            key: "tef_analysis_cache".to_string(),
            reason: "expected value at line 1".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("tef_analysis_cache"));
        assert!(msg.contains("corrupted"));
    }

    #[test]
    fn test_classification_error_display_timeout() {
        let err = ClassificationError::Timeout {
            provider: "coach".to_string(),
            timeout_ms: 20_000,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("coach"));
        assert!(msg.contains("20000"));
    }

    #[test]
    fn test_thermic_error_from_variants() {
        let storage = ThermicError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, ThermicError::Storage(_)));

        let classification = ThermicError::from(ClassificationError::ProviderNotConfigured);
        assert!(matches!(classification, ThermicError::Classification(_)));

        let config = ThermicError::from(ConfigError::Parse {
            reason: "bad".to_string(),
        });
        assert!(matches!(config, ThermicError::Config(_)));
    }
}
