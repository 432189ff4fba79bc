use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Error, Sqlite, SqlitePool, Transaction};
use thiserror::Error;

pub mod models;
pub mod queries;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to parse database URL: {0}")]
    UrlParse(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] Error),
    #[error("Failed to create schema: {0}")]
    Schema(String),
}

/// Tables are created on first start; there is no migration history.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    phone         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pharmacies (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    phone         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    pharmacy_name TEXT NOT NULL,
    address       TEXT NOT NULL,
    licence       TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS requests (
    id            TEXT PRIMARY KEY,
    customer_id   TEXT,
    customer_name TEXT NOT NULL DEFAULT '',
    address       TEXT NOT NULL,
    phone         TEXT NOT NULL,
    city          TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'pending',
    accepted_by   TEXT,
    bill_id       TEXT,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS requests_customer ON requests (customer_id);

CREATE TABLE IF NOT EXISTS request_medicines (
    request_id TEXT NOT NULL REFERENCES requests (id),
    position   INTEGER NOT NULL,
    name       TEXT NOT NULL,
    kind       TEXT NOT NULL DEFAULT '',
    strength   TEXT NOT NULL DEFAULT '',
    quantity   INTEGER NOT NULL,
    PRIMARY KEY (request_id, position)
);

CREATE TABLE IF NOT EXISTS request_pharmacies (
    request_id    TEXT NOT NULL REFERENCES requests (id),
    position      INTEGER NOT NULL,
    pharmacy_id   TEXT NOT NULL,
    pharmacy_name TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (request_id, pharmacy_id)
);

CREATE INDEX IF NOT EXISTS request_pharmacies_pharmacy ON request_pharmacies (pharmacy_id);

CREATE TABLE IF NOT EXISTS request_declines (
    request_id    TEXT NOT NULL REFERENCES requests (id),
    pharmacy_id   TEXT NOT NULL,
    pharmacy_name TEXT NOT NULL DEFAULT '',
    declined_at   TEXT NOT NULL,
    PRIMARY KEY (request_id, pharmacy_id)
);

CREATE TABLE IF NOT EXISTS bills (
    id               TEXT PRIMARY KEY,
    request_id       TEXT NOT NULL REFERENCES requests (id),
    pharmacy_id      TEXT NOT NULL,
    customer_id      TEXT,
    subtotal         REAL NOT NULL,
    delivery_charges REAL NOT NULL,
    total_amount     REAL NOT NULL,
    delivery_time    TEXT NOT NULL,
    status           TEXT NOT NULL DEFAULT 'generated',
    created_at       TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS bills_request_pharmacy ON bills (request_id, pharmacy_id);
CREATE INDEX IF NOT EXISTS bills_customer ON bills (customer_id);

CREATE TABLE IF NOT EXISTS bill_medicines (
    bill_id        TEXT NOT NULL REFERENCES bills (id),
    position       INTEGER NOT NULL,
    name           TEXT NOT NULL,
    kind           TEXT NOT NULL DEFAULT '',
    strength       TEXT NOT NULL DEFAULT '',
    quantity       INTEGER NOT NULL,
    price_per_unit REAL NOT NULL,
    total_price    REAL NOT NULL,
    PRIMARY KEY (bill_id, position)
);
"#;

/// How long a writer waits for another writer's lock before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the SQLite pool, creating the database file and tables if needed.
pub async fn init_db(database_url: &str, max_connections: u32) -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DatabaseError::UrlParse(e.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .map_err(DatabaseError::Sqlx)?;

    ensure_schema(&pool).await?;

    Ok(pool)
}

pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), DatabaseError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::Schema(e.to_string()))?;

    Ok(())
}

/// Starts a transaction that holds the write lock from its first statement.
///
/// A deferred transaction that reads before it writes cannot upgrade its lock
/// while another writer is active, and SQLite fails it with `SQLITE_BUSY`
/// instead of waiting. Taking the lock up front makes concurrent writers queue
/// on the busy timeout, so each sees the committed state of the one before it.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Round trip used by the health endpoint.
pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
