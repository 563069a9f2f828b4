//! Round trips against a live PostgreSQL server.
//!
//! Ignored by default. Point the `LOGSHIP_DATABASE__*` variables at a scratch
//! database and run with `--ignored`.

use logship_core::config::DatabaseConfig;
use logship_core::{Decoded, Decoder, Schema, ShipperConfig};
use logship_store::postgres::pg_config;
use logship_store::{PgSink, RecordSink};
use std::sync::Arc;
use tokio_postgres::NoTls;

fn scratch_config() -> DatabaseConfig {
    let mut cfg = ShipperConfig::load(None).unwrap().database;
    cfg.table = format!("logship_test_{}", std::process::id());
    cfg
}

async fn client(cfg: &DatabaseConfig) -> tokio_postgres::Client {
    let (client, connection) = pg_config(cfg).connect(NoTls).await.unwrap();
    tokio::spawn(connection);
    client
}

async fn column_shape(client: &tokio_postgres::Client, table: &str) -> Vec<(String, String)> {
    client
        .query(
            "SELECT column_name::text, data_type::text FROM information_schema.columns \
             WHERE table_name = $1 ORDER BY ordinal_position",
            &[&table],
        )
        .await
        .unwrap()
        .iter()
        .map(|row| (row.get(0), row.get(1)))
        .collect()
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server"]
async fn test_ensure_table_twice_keeps_shape() {
    let cfg = scratch_config();
    let schema = Schema::traefik();
    let mut sink = PgSink::new(&cfg, &schema);
    let admin = client(&cfg).await;

    sink.ensure_table().await.unwrap();
    let first = column_shape(&admin, &cfg.table).await;
    sink.ensure_table().await.unwrap();
    let second = column_shape(&admin, &cfg.table).await;

    assert_eq!(first, second);
    assert_eq!(first.len(), schema.len() + 2);
    assert_eq!(first[0].0, "id");
    assert_eq!(first.last().unwrap().0, "created_at");

    admin
        .batch_execute(&format!("DROP TABLE \"{}\"", cfg.table))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server"]
async fn test_insert_writes_one_row() {
    let cfg = scratch_config();
    let schema = Arc::new(Schema::minimal());
    let mut sink = PgSink::new(&cfg, &schema);
    sink.ensure_table().await.unwrap();

    let decoder = Decoder::new(schema, false);
    let line = r#"{"ClientAddr":"1.2.3.4","ClientHost":"1.2.3.4","ClientPort":"80","RequestMethod":"GET","RequestPath":"/","StatusCode":200,"ElapsedTime":"1ms"}"#;
    let Decoded::Record(record) = decoder.decode(line).unwrap() else {
        panic!("expected a record");
    };
    sink.insert(&record).await.unwrap();

    let admin = client(&cfg).await;
    let row = admin
        .query_one(
            &format!(
                "SELECT client_addr, status_code, created_at IS NOT NULL FROM \"{}\"",
                cfg.table
            ),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(row.get::<_, String>(0), "1.2.3.4");
    assert_eq!(row.get::<_, i64>(1), 200);
    assert!(row.get::<_, bool>(2));

    admin
        .batch_execute(&format!("DROP TABLE \"{}\"", cfg.table))
        .await
        .unwrap();
}
