use thiserror::Error;

#[derive(Debug, Error)]
#[error("bill source {source_name} unavailable: {reason}")]
pub struct SourceError {
    pub source_name: String,
    pub reason: String,
}

impl SourceError {
    pub fn new(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Where bill records come from (HTTP endpoint, export file, stdin).
///
/// Retries and backoff belong to the implementation; the reconciler only sees
/// the raw payload or a failure.
pub trait BillSource {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> String;

    /// Fetch the raw payload.
    fn fetch(&self) -> Result<String, SourceError>;
}
