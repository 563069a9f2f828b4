pub mod error;
pub mod postgres;
pub mod sink;
pub mod sql;

pub use error::StoreError;
pub use postgres::PgSink;
pub use sink::RecordSink;
