use crate::error::StoreError;
use crate::sink::RecordSink;
use crate::sql;
use async_trait::async_trait;
use logship_core::config::DatabaseConfig;
use logship_core::{FieldValue, LogRecord, Schema};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Statement};
use tracing::{debug, info, warn};

/// PostgreSQL sink holding one long-lived connection.
///
/// The connection is opened lazily and dropped after any error that leaves
/// it unusable; the next call reconnects once. Every round trip is bounded
/// by a timeout, so a dead server surfaces as an error instead of a hang.
pub struct PgSink {
    pg: tokio_postgres::Config,
    table: String,
    expected_values: usize,
    create_sql: String,
    insert_sql: String,
    connect_timeout: Duration,
    query_timeout: Duration,
    conn: Option<Connection>,
}

struct Connection {
    client: Client,
    insert: Option<Statement>,
    driver: JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Connection parameters for `config`.
pub fn pg_config(config: &DatabaseConfig) -> tokio_postgres::Config {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&config.host)
        .port(config.port)
        .dbname(&config.name)
        .user(&config.user)
        .application_name("logship")
        .connect_timeout(config.connect_timeout());
    if let Some(password) = &config.password {
        pg.password(password);
    }
    pg
}

impl PgSink {
    pub fn new(config: &DatabaseConfig, schema: &Schema) -> Self {
        Self {
            pg: pg_config(config),
            table: config.table.clone(),
            expected_values: schema.len(),
            create_sql: sql::create_table(&config.table, schema),
            insert_sql: sql::insert(&config.table, schema),
            connect_timeout: config.connect_timeout(),
            query_timeout: config.query_timeout(),
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| !c.client.is_closed())
    }

    /// The current connection, or a fresh one if there is none or it closed.
    async fn connection(&mut self) -> Result<&mut Connection, StoreError> {
        let conn = match self.conn.take() {
            Some(c) if !c.client.is_closed() => c,
            stale => {
                if stale.is_some() {
                    debug!("PostgreSQL connection closed, reconnecting");
                }
                self.connect().await?
            }
        };
        Ok(self.conn.insert(conn))
    }

    async fn connect(&self) -> Result<Connection, StoreError> {
        let (client, connection) =
            bounded("connecting", self.connect_timeout, self.pg.connect(NoTls)).await??;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection terminated");
            }
        });
        info!(table = %self.table, "Connected to PostgreSQL");
        Ok(Connection {
            client,
            insert: None,
            driver,
        })
    }

    async fn try_insert(&mut self, record: &LogRecord) -> Result<(), StoreError> {
        let timeout = self.query_timeout;
        let insert_sql = self.insert_sql.clone();
        let conn = self.connection().await?;

        let statement = match &conn.insert {
            Some(s) => s.clone(),
            None => {
                let s = bounded("preparing insert", timeout, conn.client.prepare(&insert_sql))
                    .await??;
                conn.insert = Some(s.clone());
                s
            }
        };

        let params: Vec<&(dyn ToSql + Sync)> = record.values().map(as_sql).collect();
        bounded("inserting", timeout, conn.client.execute(&statement, &params)).await??;
        Ok(())
    }

    /// Drop the connection unless the error left it usable.
    fn after_error(&mut self, err: &StoreError) {
        if !err.connection_ok() && self.conn.take().is_some() {
            debug!(error = %err, "Dropping PostgreSQL connection after error");
        }
    }
}

#[async_trait]
impl RecordSink for PgSink {
    async fn ensure_table(&mut self) -> Result<(), StoreError> {
        let timeout = self.query_timeout;
        let create_sql = self.create_sql.clone();
        let result = match self.connection().await {
            Ok(conn) => bounded("creating table", timeout, conn.client.batch_execute(&create_sql))
                .await
                .and_then(|r| r.map_err(StoreError::from)),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(table = %self.table, "Access log table ready");
                Ok(())
            }
            Err(e) => {
                self.after_error(&e);
                Err(e)
            }
        }
    }

    async fn insert(&mut self, record: &LogRecord) -> Result<(), StoreError> {
        if record.len() != self.expected_values {
            return Err(StoreError::Arity {
                expected: self.expected_values,
                got: record.len(),
            });
        }

        let result = self.try_insert(record).await;
        if let Err(e) = &result {
            self.after_error(e);
        }
        result
    }
}

fn as_sql(value: &FieldValue) -> &(dyn ToSql + Sync) {
    match value {
        FieldValue::Text(s) => s,
        FieldValue::Integer(n) => n,
        FieldValue::Timestamp(t) => t,
    }
}

async fn bounded<F: Future>(
    op: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<F::Output, StoreError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| StoreError::Timeout { op, timeout })
}
