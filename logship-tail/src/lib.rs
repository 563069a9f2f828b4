pub mod error;
pub mod reader;

pub use error::TailError;
pub use reader::{LineSource, ReadOutcome, TailReader, TailState};
