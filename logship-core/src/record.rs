use chrono::{DateTime, FixedOffset};

/// A single decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<FixedOffset>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            FieldValue::Timestamp(t) => Some(t),
            _ => None,
        }
    }
}

/// One decoded access-log event.
///
/// Values are held in schema declaration order, one per declared field,
/// so a sink can bind them positionally. Records are built by the decoder,
/// handed to a sink, and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    values: Vec<(&'static str, FieldValue)>,
}

impl LogRecord {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            values: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, key: &'static str, value: FieldValue) {
        self.values.push((key, value));
    }

    /// Value for a JSON key.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Values in binding order.
    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.values.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
