//! Boundary to the external reasoning service.

use crate::error::MemoryError;
use async_trait::async_trait;
use log::warn;
use std::time::Duration;

/// A single prompt sent to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    /// System instruction framing the task.
    pub system: String,
    /// Task prompt.
    pub prompt: String,
}

impl OracleRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

#[async_trait]
/// Natural-language reasoning service consulted for extraction and retrieval.
pub trait Oracle: Send + Sync {
    /// Send a request and return the raw text answer.
    async fn consult(&self, request: &OracleRequest) -> Result<String, MemoryError>;
}

/// Oracle used when no reasoning service is configured. Every call fails, so
/// extraction relies on the fallback extractor alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOracle;

#[async_trait]
impl Oracle for NoOracle {
    async fn consult(&self, _request: &OracleRequest) -> Result<String, MemoryError> {
        Err(MemoryError::Oracle("no oracle configured".to_string()))
    }
}

/// Consult an oracle, giving up after `timeout`.
pub async fn consult_with_timeout(
    oracle: &dyn Oracle,
    request: &OracleRequest,
    timeout: Duration,
) -> Result<String, MemoryError> {
    match tokio::time::timeout(timeout, oracle.consult(request)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("oracle call timed out (timeout_ms={})", timeout.as_millis());
            Err(MemoryError::OracleTimeout(timeout))
        }
    }
}
