pub mod ingestor;

pub use ingestor::{IngestSettings, IngestStats, Ingestor, Step};
