use crate::error::ConfigError;
use crate::schema::SchemaVariant;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level shipper configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipperConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tail: TailConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// PostgreSQL connection and target table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Upper bound on a single statement, so a hung server cannot stall the loop.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

/// Source file and polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailConfig {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Truncate the source file this often. 0 disables truncation.
    #[serde(default = "default_truncate_interval")]
    pub truncate_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeConfig {
    #[serde(default = "default_schema")]
    pub schema: SchemaVariant,
    /// Reject lines carrying keys the schema does not declare.
    #[serde(default)]
    pub strict: bool,
}

/// Prometheus endpoint. Disabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_db_host() -> String { "localhost".into() }
fn default_db_port() -> u16 { 5432 }
fn default_db_name() -> String { "traefik_logs".into() }
fn default_db_user() -> String { "postgres".into() }
fn default_table() -> String { "access_logs".into() }
fn default_connect_timeout() -> u64 { 10 }
fn default_query_timeout() -> u64 { 30 }
fn default_log_path() -> PathBuf { PathBuf::from("/var/log/traefik/access.log") }
fn default_poll_interval() -> u64 { 5 }
fn default_truncate_interval() -> u64 { 3600 }
fn default_schema() -> SchemaVariant { SchemaVariant::Traefik }
fn default_metrics_addr() -> String { "0.0.0.0:9190".into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            name: default_db_name(),
            user: default_db_user(),
            password: None,
            table: default_table(),
            connect_timeout_secs: default_connect_timeout(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            poll_interval_secs: default_poll_interval(),
            truncate_interval_secs: default_truncate_interval(),
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            strict: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

impl TailConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// `None` when truncation is disabled.
    pub fn truncate_interval(&self) -> Option<Duration> {
        (self.truncate_interval_secs > 0).then(|| Duration::from_secs(self.truncate_interval_secs))
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Variables understood for compatibility with container setups that
/// predate the `LOGSHIP_` prefix.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.name"),
    ("DB_USER", "database.user"),
    ("DB_PASS", "database.password"),
    ("LOG_FILE_PATH", "tail.path"),
];

impl ShipperConfig {
    /// Load defaults, then the optional YAML file, then environment overrides.
    ///
    /// `LOGSHIP_` variables win over the legacy `DB_*` ones and are split on
    /// `__`, e.g. `LOGSHIP_TAIL__POLL_INTERVAL_SECS=1`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(ShipperConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: ShipperConfig = figment
            .merge(legacy_env())
            .merge(Env::prefixed("LOGSHIP_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.host.trim().is_empty() {
            return Err(ConfigError::Invalid("database.host is empty".into()));
        }
        if self.database.user.trim().is_empty() {
            return Err(ConfigError::Invalid("database.user is empty".into()));
        }
        if !is_identifier(&self.database.table) {
            return Err(ConfigError::Invalid(format!(
                "database.table `{}` is not a plain SQL identifier",
                self.database.table
            )));
        }
        if self.database.connect_timeout_secs == 0 || self.database.query_timeout_secs == 0 {
            return Err(ConfigError::Invalid("database timeouts must be > 0".into()));
        }
        if self.tail.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("tail.poll_interval_secs must be > 0".into()));
        }
        if self.tail.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("tail.path is empty".into()));
        }
        Ok(())
    }
}

fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key == *name)
            .map(|(_, path)| (*path).into())
    })
}

/// `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes (PostgreSQL's NAMEDATALEN - 1).
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= 63
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
