use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TailError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("truncate failed: {0}")]
    Truncate(#[source] std::io::Error),
}
