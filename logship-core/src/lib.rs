pub mod config;
pub mod decoder;
pub mod error;
pub mod record;
pub mod schema;

pub use config::ShipperConfig;
pub use decoder::{Decoded, Decoder};
pub use error::{ConfigError, DecodeError, DecodeErrorKind};
pub use record::{FieldValue, LogRecord};
pub use schema::{FieldKind, FieldSpec, Schema, SchemaVariant};
