use crate::error::{DecodeError, DecodeErrorKind};
use crate::record::{FieldValue, LogRecord};
use crate::schema::{FieldKind, FieldSpec, Schema};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Outcome of decoding a line that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Record(LogRecord),
    /// Blank line: nothing to persist, nothing to report.
    Skip,
}

/// Turns raw access-log lines into [`LogRecord`]s.
///
/// Tolerant by default: keys the schema does not declare are ignored,
/// since the proxy's log format gains fields between releases. In strict
/// mode any undeclared key rejects the line.
#[derive(Debug, Clone)]
pub struct Decoder {
    schema: Arc<Schema>,
    strict: bool,
}

impl Decoder {
    pub fn new(schema: Arc<Schema>, strict: bool) -> Self {
        Self { schema, strict }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Decode a line that has not been checked for UTF-8 yet.
    pub fn decode_bytes(&self, line: &[u8]) -> Result<Decoded, DecodeError> {
        match std::str::from_utf8(line) {
            Ok(line) => self.decode(line),
            Err(e) => Err(DecodeError::new(
                DecodeErrorKind::InvalidUtf8(e.valid_up_to()),
                &String::from_utf8_lossy(line),
            )),
        }
    }

    pub fn decode(&self, line: &str) -> Result<Decoded, DecodeError> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            return Ok(Decoded::Skip);
        }

        let value: Value = serde_json::from_str(line)
            .map_err(|e| DecodeError::new(DecodeErrorKind::MalformedJson(e.to_string()), line))?;
        let Value::Object(object) = value else {
            return Err(DecodeError::new(DecodeErrorKind::NotAnObject, line));
        };

        if self.strict {
            if let Some(key) = object.keys().find(|k| self.schema.field(k).is_none()) {
                return Err(DecodeError::new(
                    DecodeErrorKind::UnknownField(key.clone()),
                    line,
                ));
            }
        }

        self.build(&object)
            .map(Decoded::Record)
            .map_err(|kind| DecodeError::new(kind, line))
    }

    fn build(&self, object: &Map<String, Value>) -> Result<LogRecord, DecodeErrorKind> {
        let mut record = LogRecord::with_capacity(self.schema.len());
        for spec in self.schema.fields() {
            let value = match object.get(spec.key) {
                None if spec.required => return Err(DecodeErrorKind::MissingField(spec.key)),
                Some(Value::Null) if spec.required => {
                    return Err(DecodeErrorKind::WrongType {
                        field: spec.key,
                        expected: expected_name(spec.kind),
                    });
                }
                None | Some(Value::Null) => default_value(spec.kind),
                Some(raw) => coerce(spec, raw)?,
            };
            record.push(spec.key, value);
        }
        Ok(record)
    }
}

fn coerce(spec: &FieldSpec, raw: &Value) -> Result<FieldValue, DecodeErrorKind> {
    let wrong_type = || DecodeErrorKind::WrongType {
        field: spec.key,
        expected: expected_name(spec.kind),
    };

    match spec.kind {
        FieldKind::Text => raw
            .as_str()
            .map(|s| FieldValue::Text(s.to_string()))
            .ok_or_else(wrong_type),
        FieldKind::Integer => raw.as_i64().map(FieldValue::Integer).ok_or_else(wrong_type),
        FieldKind::Timestamp => {
            let s = raw.as_str().ok_or_else(wrong_type)?;
            DateTime::parse_from_rfc3339(s)
                .map(FieldValue::Timestamp)
                .map_err(|_| DecodeErrorKind::BadTimestamp {
                    field: spec.key,
                    value: s.to_string(),
                })
        }
    }
}

fn default_value(kind: FieldKind) -> FieldValue {
    match kind {
        FieldKind::Text => FieldValue::Text(String::new()),
        FieldKind::Integer => FieldValue::Integer(0),
        FieldKind::Timestamp => FieldValue::Timestamp(DateTime::<Utc>::UNIX_EPOCH.fixed_offset()),
    }
}

fn expected_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "string",
        FieldKind::Integer => "integer",
        FieldKind::Timestamp => "timestamp string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(strict: bool) -> Decoder {
        Decoder::new(Arc::new(Schema::minimal()), strict)
    }

    const LINE: &str = r#"{"ClientAddr":"1.2.3.4:5555","ClientHost":"1.2.3.4","ClientPort":"5555","RequestMethod":"GET","RequestPath":"/","StatusCode":200,"ElapsedTime":"1ms"}"#;

    #[test]
    fn blank_lines_are_skipped() {
        let d = minimal(false);
        assert_eq!(d.decode("").unwrap(), Decoded::Skip);
        assert_eq!(d.decode("   \t ").unwrap(), Decoded::Skip);
        assert_eq!(d.decode("\r\n").unwrap(), Decoded::Skip);
    }

    #[test]
    fn trailing_newline_is_ignored() {
        let d = minimal(false);
        let line = format!("{LINE}\r\n");
        assert!(matches!(d.decode(&line).unwrap(), Decoded::Record(_)));
    }

    #[test]
    fn invalid_utf8_is_rejected_not_repaired() {
        // `"RequestPath":"/"` becomes `"RequestPath":"/\xff"`.
        let at = LINE.find(r#""/""#).unwrap() + 2;
        let mut raw = LINE.as_bytes().to_vec();
        raw.insert(at, 0xff);

        let err = minimal(false).decode_bytes(&raw).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidUtf8(at));
        assert!(err.line.contains('\u{FFFD}'));
    }

    #[test]
    fn valid_bytes_decode_like_str() {
        let d = minimal(false);
        assert_eq!(d.decode_bytes(LINE.as_bytes()).unwrap(), d.decode(LINE).unwrap());
        assert_eq!(d.decode_bytes(b"  ").unwrap(), Decoded::Skip);
    }

    #[test]
    fn array_is_not_an_object() {
        let err = minimal(false).decode("[1,2,3]").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::NotAnObject);
    }

    #[test]
    fn null_required_field_is_wrong_type() {
        let line = LINE.replace(r#""RequestPath":"/""#, r#""RequestPath":null"#);
        let err = minimal(false).decode(&line).unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::WrongType {
                field: "RequestPath",
                expected: "string"
            }
        );
    }

    #[test]
    fn fractional_integer_is_rejected() {
        let line = LINE.replace("200", "200.5");
        let err = minimal(false).decode(&line).unwrap_err();
        assert!(matches!(
            err.kind,
            DecodeErrorKind::WrongType { field: "StatusCode", .. }
        ));
    }

    #[test]
    fn strict_mode_reports_first_unknown_key() {
        let line = LINE.replace("{", r#"{"Extra":1,"#);
        let err = minimal(true).decode(&line).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownField("Extra".into()));
    }

    #[test]
    fn error_carries_offending_line() {
        let err = minimal(false).decode("not json").unwrap_err();
        assert_eq!(err.line, "not json");
        assert!(matches!(err.kind, DecodeErrorKind::MalformedJson(_)));
    }
}
