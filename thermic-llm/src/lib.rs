//! THERMIC LLM - Classification Collaborator
//!
//! Provider-agnostic trait for the external enhancement classifier, plus a
//! client that bounds every call with a timeout and turns any failure into
//! "no opinion". Transport to a real AI service is user-supplied.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thermic_core::{
    ClassificationError, ExternalOpinion, ProjectedEntry, ThermicConfig, ThermicError,
    ThermicResult,
};

// ============================================================================
// CLASSIFICATION PROVIDER TRAIT
// ============================================================================

/// An external service that rates the thermogenic enhancement of a meal list.
///
/// The response is untrusted JSON; see [`ClassificationOpinion::from_value`]
/// for how it is read.
///
/// # Example
/// ```ignore
/// struct CoachClassifier { /* http client */ }
///
/// #[async_trait]
/// impl ClassificationProvider for CoachClassifier {
///     fn provider_id(&self) -> &str { "coach" }
///     async fn classify(&self, entries: &[ProjectedEntry]) -> ThermicResult<Value> {
///         // POST entries, return the parsed body
///     }
/// }
/// ```
#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    /// Identifier used in logs and errors.
    fn provider_id(&self) -> &str;

    /// Classify the projected entries.
    async fn classify(&self, entries: &[ProjectedEntry]) -> ThermicResult<Value>;
}

// ============================================================================
// CLASSIFICATION OPINION
// ============================================================================

/// A leniently parsed classifier response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOpinion {
    pub enhancement_multiplier: Option<f64>,
    pub enhancement_factors: Vec<String>,
    pub confidence: Option<f64>,
}

impl ClassificationOpinion {
    /// Read whatever is usable from a response.
    ///
    /// - a JSON string payload is parsed as JSON first
    /// - a non-finite or non-numeric multiplier is absent
    /// - non-string factors are skipped, blanks dropped, duplicates removed
    /// - a confidence outside `[0, 1]` is absent
    /// - anything that is not an object yields an empty opinion
    pub fn from_value(value: &Value) -> Self {
        if let Value::String(text) = value {
            return serde_json::from_str::<Value>(text)
                .map(|parsed| match parsed {
                    Value::String(_) => Self::default(),
                    other => Self::from_value(&other),
                })
                .unwrap_or_default();
        }

        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let enhancement_multiplier = object
            .get("enhancementMultiplier")
            .and_then(Value::as_f64)
            .filter(|m| m.is_finite());

        let mut enhancement_factors: Vec<String> = Vec::new();
        if let Some(items) = object.get("enhancementFactors").and_then(Value::as_array) {
            for label in items.iter().filter_map(Value::as_str).map(str::trim) {
                if !label.is_empty() && !enhancement_factors.iter().any(|f| f == label) {
                    enhancement_factors.push(label.to_string());
                }
            }
        }

        let confidence = object
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| (0.0..=1.0).contains(c));

        Self {
            enhancement_multiplier,
            enhancement_factors,
            confidence,
        }
    }

    /// True when the response carried nothing usable.
    pub fn is_empty(&self) -> bool {
        self.enhancement_multiplier.is_none() && self.enhancement_factors.is_empty()
    }

    pub fn into_external(self) -> ExternalOpinion {
        ExternalOpinion::new(self.enhancement_multiplier, self.enhancement_factors)
    }
}

// ============================================================================
// CLASSIFICATION CLIENT
// ============================================================================

/// Timeout-guarded access to an optional provider.
///
/// Every failure mode (no provider, error, timeout, empty or low-confidence
/// response) comes back as `None` after a `warn!`. Callers never see an
/// error from here.
#[derive(Clone)]
pub struct ClassificationClient {
    provider: Option<Arc<dyn ClassificationProvider>>,
    timeout: Duration,
    min_confidence: f64,
}

impl std::fmt::Debug for ClassificationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationClient")
            .field("provider", &self.provider.as_ref().map(|p| p.provider_id().to_string()))
            .field("timeout", &self.timeout)
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

impl ClassificationClient {
    pub fn new(provider: Arc<dyn ClassificationProvider>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
            min_confidence: 0.0,
        }
    }

    /// A client that always answers "no opinion".
    pub fn disabled() -> Self {
        Self {
            provider: None,
            timeout: Duration::ZERO,
            min_confidence: 0.0,
        }
    }

    /// Build from config; `None` gives a disabled client.
    pub fn from_config(
        provider: Option<Arc<dyn ClassificationProvider>>,
        config: &ThermicConfig,
    ) -> Self {
        Self {
            provider,
            timeout: config.classification_timeout,
            min_confidence: 0.0,
        }
    }

    /// Discard opinions that report a confidence below `floor`. Opinions
    /// without a confidence are kept.
    pub fn with_min_confidence(mut self, floor: f64) -> Self {
        self.min_confidence = floor.clamp(0.0, 1.0);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Classify, swallowing every failure.
    pub async fn classify(&self, entries: &[ProjectedEntry]) -> Option<ExternalOpinion> {
        match self.try_classify(entries).await {
            Ok(opinion) => {
                tracing::debug!(
                    multiplier = ?opinion.enhancement_multiplier,
                    factors = opinion.enhancement_factors.len(),
                    "External classification received"
                );
                Some(opinion.into_external())
            }
            Err(ClassificationError::ProviderNotConfigured) => None,
            Err(e) => {
                tracing::warn!(error = %e, "External classification unavailable, using local estimate");
                None
            }
        }
    }

    /// Classify and report why a result is unusable.
    pub async fn try_classify(
        &self,
        entries: &[ProjectedEntry],
    ) -> Result<ClassificationOpinion, ClassificationError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(ClassificationError::ProviderNotConfigured)?;
        let provider_id = provider.provider_id().to_string();

        let response = tokio::time::timeout(self.timeout, provider.classify(entries))
            .await
            .map_err(|_| ClassificationError::Timeout {
                provider: provider_id.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|e| into_classification_error(&provider_id, e))?;

        let opinion = ClassificationOpinion::from_value(&response);
        if opinion.is_empty() {
            return Err(ClassificationError::InvalidResponse {
                provider: provider_id,
                reason: "no usable multiplier or factors".to_string(),
            });
        }
        if let Some(confidence) = opinion.confidence {
            if confidence < self.min_confidence {
                return Err(ClassificationError::InvalidResponse {
                    provider: provider_id,
                    reason: format!(
                        "confidence {:.2} below floor {:.2}",
                        confidence, self.min_confidence
                    ),
                });
            }
        }
        Ok(opinion)
    }
}

fn into_classification_error(provider: &str, error: ThermicError) -> ClassificationError {
    match error {
        ThermicError::Classification(e) => e,
        other => ClassificationError::RequestFailed {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}

// ============================================================================
// MOCK PROVIDERS FOR TESTING
// ============================================================================

/// Returns a fixed payload after an optional delay and records each request.
#[derive(Debug)]
pub struct MockClassificationProvider {
    provider_id: String,
    payload: Value,
    delay: Duration,
    calls: AtomicUsize,
    last_request: Mutex<Option<Vec<ProjectedEntry>>>,
}

impl MockClassificationProvider {
    /// Create a mock provider that answers with `payload`.
    pub fn new(payload: Value) -> Self {
        Self {
            provider_id: "mock".to_string(),
            payload,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Convenience for the common `{enhancementMultiplier, enhancementFactors, confidence}` shape.
    pub fn with_opinion(multiplier: f64, factors: &[&str], confidence: f64) -> Self {
        Self::new(serde_json::json!({
            "enhancementMultiplier": multiplier,
            "enhancementFactors": factors,
            "confidence": confidence,
        }))
    }

    /// Wait `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Entries of the most recent request.
    pub fn last_request(&self) -> Option<Vec<ProjectedEntry>> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl ClassificationProvider for MockClassificationProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn classify(&self, entries: &[ProjectedEntry]) -> ThermicResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(entries.to_vec());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.payload.clone())
    }
}

/// Always fails with `RequestFailed`.
#[derive(Debug, Default)]
pub struct FailingClassificationProvider {
    calls: AtomicUsize,
}

impl FailingClassificationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationProvider for FailingClassificationProvider {
    fn provider_id(&self) -> &str {
        "failing"
    }

    async fn classify(&self, _entries: &[ProjectedEntry]) -> ThermicResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ClassificationError::RequestFailed {
            provider: "failing".to_string(),
            reason: "service unavailable".to_string(),
        }
        .into())
    }
}
