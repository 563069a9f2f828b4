use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("timed out after {timeout:?} while {op}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("record has {got} values but the schema declares {expected}")]
    Arity { expected: usize, got: usize },
}

impl StoreError {
    /// Whether the connection that produced this error is still usable.
    ///
    /// Server-side errors (constraint violations, bad values) leave the
    /// session intact; everything else means reconnect.
    pub fn connection_ok(&self) -> bool {
        match self {
            StoreError::Postgres(e) => e.as_db_error().is_some(),
            StoreError::Timeout { .. } => false,
            StoreError::Arity { .. } => true,
        }
    }
}
