// 🌐 External Collaborators - verification sources and public indices
//
// Each source is an injectable trait object. Every call goes through a
// guard that applies the configured timeout and retry budget and turns a
// final failure into an invalid / not-findable answer.

use crate::config::CallPolicy;
use crate::error::CollaboratorError;
use crate::record::Record;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// RESULTS
// ============================================================================

/// One external source's verdict on a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSourceResult {
    pub source: String,
    pub valid: bool,
    /// 0-100, the source's confidence in its own verdict
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Set only when the call failed and this is the failure marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExternalSourceResult {
    pub fn confirmed(source: &str, confidence: f64, reference: Option<&str>) -> Self {
        ExternalSourceResult {
            source: source.to_string(),
            valid: true,
            confidence,
            reference: reference.map(|r| r.to_string()),
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn denied(source: &str, confidence: f64, reference: Option<&str>) -> Self {
        ExternalSourceResult {
            valid: false,
            ..Self::confirmed(source, confidence, reference)
        }
    }

    /// Failure marker for a source that could not answer
    pub(crate) fn unanswered(source: &str, err: &CollaboratorError) -> Self {
        ExternalSourceResult {
            source: source.to_string(),
            valid: false,
            confidence: 0.0,
            reference: None,
            timestamp: Utc::now(),
            error: Some(err.to_string()),
        }
    }
}

/// One public index's answer to "would this fact surface here?"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexLookup {
    pub index: String,
    pub findable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// A source that can confirm or deny a record
#[async_trait]
pub trait ExternalVerifier: Send + Sync {
    fn name(&self) -> &str;

    async fn verify(&self, record: &Record) -> Result<ExternalSourceResult, CollaboratorError>;
}

/// A public index that may or may not surface the record independently
#[async_trait]
pub trait ReproducibilityIndex: Send + Sync {
    fn name(&self) -> &str;

    async fn is_findable(&self, record: &Record) -> Result<bool, CollaboratorError>;
}

pub type VerifierPanel = Vec<Arc<dyn ExternalVerifier>>;
pub type IndexPanel = Vec<Arc<dyn ReproducibilityIndex>>;

// ============================================================================
// CALL GUARD
// ============================================================================

/// Run `call` under the timeout, retrying retryable failures
async fn call_with_policy<T, F, Fut>(
    policy: &CallPolicy,
    name: &str,
    mut call: F,
) -> Result<T, CollaboratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let mut attempt: u32 = 0;

    loop {
        let outcome = match tokio::time::timeout(policy.timeout(), call()).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout {
                source_name: name.to_string(),
                timeout_ms: policy.timeout_ms,
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if !err.is_retryable() || attempt >= policy.attempts() {
                    return Err(err);
                }

                warn!(
                    collaborator = name,
                    attempt,
                    max_attempts = policy.attempts(),
                    error = %err,
                    "Collaborator call failed, retrying"
                );
                tokio::time::sleep(policy.backoff(attempt)).await;
            }
        }
    }
}

/// Ask one verifier; never fails
pub async fn guarded_verify(
    verifier: &dyn ExternalVerifier,
    record: &Record,
    policy: &CallPolicy,
) -> ExternalSourceResult {
    let name = verifier.name();

    match call_with_policy(policy, name, move || verifier.verify(record)).await {
        Ok(mut result) => {
            if !result.confidence.is_finite() {
                result.confidence = 0.0;
            }
            result.confidence = result.confidence.clamp(0.0, 100.0);
            debug!(source = name, valid = result.valid, "External source answered");
            result
        }
        Err(err) => {
            warn!(source = name, error = %err, "External source gave no answer, counting as invalid");
            ExternalSourceResult::unanswered(name, &err)
        }
    }
}

/// Ask one index; never fails
pub async fn guarded_lookup(
    index: &dyn ReproducibilityIndex,
    record: &Record,
    policy: &CallPolicy,
) -> IndexLookup {
    let name = index.name();

    match call_with_policy(policy, name, move || index.is_findable(record)).await {
        Ok(findable) => IndexLookup {
            index: name.to_string(),
            findable,
            error: None,
        },
        Err(err) => {
            warn!(index = name, error = %err, "Index gave no answer, counting as not findable");
            IndexLookup {
                index: name.to_string(),
                findable: false,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Consult the whole verifier panel concurrently; results keep panel order
pub async fn consult_verifiers(
    panel: &[Arc<dyn ExternalVerifier>],
    record: &Record,
    policy: &CallPolicy,
) -> Vec<ExternalSourceResult> {
    join_all(
        panel
            .iter()
            .map(|verifier| guarded_verify(verifier.as_ref(), record, policy)),
    )
    .await
}

/// Consult the whole index panel concurrently; results keep panel order
pub async fn consult_indices(
    panel: &[Arc<dyn ReproducibilityIndex>],
    record: &Record,
    policy: &CallPolicy,
) -> Vec<IndexLookup> {
    join_all(
        panel
            .iter()
            .map(|index| guarded_lookup(index.as_ref(), record, policy)),
    )
    .await
}

// ============================================================================
// TEST FAKES
// ============================================================================


// ============================================================================
// TESTS
// ============================================================================
