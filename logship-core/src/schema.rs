use serde::{Deserialize, Serialize};

/// Primitive type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    /// RFC 3339 string in the log line, `TIMESTAMPTZ` in storage.
    Timestamp,
}

impl FieldKind {
    /// Column type used in `CREATE TABLE`.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Integer => "BIGINT",
            FieldKind::Timestamp => "TIMESTAMPTZ",
        }
    }
}

/// One entry of the declarative field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key as it appears in the JSON log line.
    pub key: &'static str,
    /// Storage column, derived from `key`.
    pub column: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(key: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            column: column_name(key),
            kind,
            required: true,
        }
    }

    pub fn optional(key: &'static str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(key, kind)
        }
    }
}

/// Built-in schema shapes, selectable from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Seven-field form: client identity, method, path, status, elapsed time.
    Minimal,
    /// Full Traefik JSON access-log format.
    Traefik,
}

/// Ordered field table shared by table creation, decoding and inserts.
///
/// The order is load-bearing: inserts bind values positionally in exactly
/// the order returned by [`Schema::fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn for_variant(variant: SchemaVariant) -> Self {
        match variant {
            SchemaVariant::Minimal => Self::minimal(),
            SchemaVariant::Traefik => Self::traefik(),
        }
    }

    pub fn minimal() -> Self {
        use FieldKind::*;
        Self::new(vec![
            FieldSpec::required("ClientAddr", Text),
            FieldSpec::required("ClientHost", Text),
            FieldSpec::required("ClientPort", Text),
            FieldSpec::required("RequestMethod", Text),
            FieldSpec::required("RequestPath", Text),
            FieldSpec::required("StatusCode", Integer),
            FieldSpec::required("ElapsedTime", Text),
        ])
    }

    pub fn traefik() -> Self {
        use FieldKind::*;
        Self::new(vec![
            // network identity
            FieldSpec::required("ClientAddr", Text),
            FieldSpec::required("ClientHost", Text),
            FieldSpec::required("ClientPort", Text),
            FieldSpec::optional("ClientUsername", Text),
            // request identity
            FieldSpec::required("RequestAddr", Text),
            FieldSpec::required("RequestHost", Text),
            FieldSpec::required("RequestPort", Text),
            FieldSpec::required("RequestMethod", Text),
            FieldSpec::required("RequestPath", Text),
            FieldSpec::required("RequestProtocol", Text),
            FieldSpec::required("RequestScheme", Text),
            // sizing / timing
            FieldSpec::required("RequestContentSize", Integer),
            FieldSpec::required("RequestCount", Integer),
            FieldSpec::required("DownstreamContentSize", Integer),
            FieldSpec::required("OriginContentSize", Integer),
            FieldSpec::required("Duration", Integer),
            FieldSpec::required("OriginDuration", Integer),
            FieldSpec::required("Overhead", Integer),
            // routing / service identity, absent when no router matched
            FieldSpec::optional("entryPointName", Text),
            FieldSpec::optional("RouterName", Text),
            FieldSpec::optional("ServiceName", Text),
            FieldSpec::optional("ServiceAddr", Text),
            FieldSpec::optional("ServiceURL", Text),
            // retry / status
            FieldSpec::required("RetryAttempts", Integer),
            FieldSpec::required("OriginStatus", Integer),
            FieldSpec::required("DownstreamStatus", Integer),
            // tls, absent for plaintext requests
            FieldSpec::optional("TLSCipher", Text),
            FieldSpec::optional("TLSVersion", Text),
            // timestamps
            FieldSpec::required("StartLocal", Timestamp),
            FieldSpec::required("StartUTC", Timestamp),
            FieldSpec::required("time", Timestamp),
            // free-form
            FieldSpec::required("level", Text),
            FieldSpec::required("msg", Text),
        ])
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by its JSON key.
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Position of a field in binding order.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key == key)
    }

    /// Column names in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.column.as_str())
    }
}

/// `RequestMethod` → `request_method`, `TLSCipher` → `tls_cipher`,
/// `StartUTC` → `start_utc`.
///
/// A run of capitals is kept together as one word; the last capital of the
/// run starts a new word when a lowercase letter follows it.
pub fn column_name(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_name_splits_camel_case() {
        assert_eq!(column_name("RequestMethod"), "request_method");
        assert_eq!(column_name("ClientAddr"), "client_addr");
        assert_eq!(column_name("entryPointName"), "entry_point_name");
    }

    #[test]
    fn column_name_keeps_acronyms_together() {
        assert_eq!(column_name("TLSCipher"), "tls_cipher");
        assert_eq!(column_name("TLSVersion"), "tls_version");
        assert_eq!(column_name("StartUTC"), "start_utc");
        assert_eq!(column_name("ServiceURL"), "service_url");
    }

    #[test]
    fn column_name_leaves_lowercase_alone() {
        assert_eq!(column_name("time"), "time");
        assert_eq!(column_name("msg"), "msg");
    }

    #[test]
    fn traefik_schema_has_33_fields() {
        assert_eq!(Schema::traefik().len(), 33);
    }

    #[test]
    fn minimal_schema_matches_seven_field_form() {
        let schema = Schema::minimal();
        let columns: Vec<&str> = schema.columns().collect();
        assert_eq!(
            columns,
            vec![
                "client_addr",
                "client_host",
                "client_port",
                "request_method",
                "request_path",
                "status_code",
                "elapsed_time",
            ]
        );
        assert!(schema.fields().iter().all(|f| f.required));
    }

    #[test]
    fn lookup_returns_kind_and_column() {
        let schema = Schema::traefik();
        let f = schema.field("DownstreamStatus").unwrap();
        assert_eq!(f.kind, FieldKind::Integer);
        assert_eq!(f.column, "downstream_status");
        assert!(schema.field("Nope").is_none());
    }

    #[test]
    fn optional_fields_are_routing_tls_and_identity() {
        let schema = Schema::traefik();
        let optional: Vec<&str> = schema
            .fields()
            .iter()
            .filter(|f| !f.required)
            .map(|f| f.key)
            .collect();
        assert_eq!(
            optional,
            vec![
                "ClientUsername",
                "entryPointName",
                "RouterName",
                "ServiceName",
                "ServiceAddr",
                "ServiceURL",
                "TLSCipher",
                "TLSVersion",
            ]
        );
    }

    #[test]
    fn columns_are_unique() {
        for schema in [Schema::minimal(), Schema::traefik()] {
            let mut columns: Vec<&str> = schema.columns().collect();
            let n = columns.len();
            columns.sort();
            columns.dedup();
            assert_eq!(columns.len(), n);
        }
    }

    #[test]
    fn timestamp_fields_use_timestamptz() {
        let schema = Schema::traefik();
        for key in ["StartLocal", "StartUTC", "time"] {
            assert_eq!(schema.field(key).unwrap().kind.sql_type(), "TIMESTAMPTZ");
        }
    }
}
