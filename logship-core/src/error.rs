use thiserror::Error;

/// Longest excerpt of an offending line carried in a [`DecodeError`].
const MAX_EXCERPT: usize = 512;

/// Why a line was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("line is not valid UTF-8 at byte {0}")]
    InvalidUtf8(usize),

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("line is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has wrong type, expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` is not an RFC 3339 timestamp: {value}")]
    BadTimestamp { field: &'static str, value: String },

    #[error("undeclared field `{0}`")]
    UnknownField(String),
}

/// A rejected line, carrying the content for diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} in line: {line}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub line: String,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, line: &str) -> Self {
        Self {
            kind,
            line: excerpt(line),
        }
    }
}

fn excerpt(line: &str) -> String {
    if line.len() <= MAX_EXCERPT {
        return line.to_string();
    }
    let mut end = MAX_EXCERPT;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &line[..end])
}

/// Configuration could not be loaded or is unusable.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}
