use crate::error::StoreError;
use async_trait::async_trait;
use logship_core::LogRecord;

/// Destination for decoded records.
///
/// Failures are returned to the caller; the sink itself never retries
/// inline.
#[async_trait]
pub trait RecordSink: Send {
    /// Create the target table if it does not exist. Safe to call on
    /// every startup.
    async fn ensure_table(&mut self) -> Result<(), StoreError>;

    /// Persist one record as a single row.
    async fn insert(&mut self, record: &LogRecord) -> Result<(), StoreError>;
}
