pub mod db;

pub mod bids;
pub mod certificates;
pub mod contracts;
pub mod lots;
pub mod memberships;
pub mod otp;
pub mod outbox;

use std::env;

pub use db::SqliteDatabase;
use log::info;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::traits::MarketDbError;

const SQLITE_DB_URL: &str = "sqlite://data/saf_trade.db";

pub fn db_url() -> String {
    let result = env::var("STS_DATABASE_URL").unwrap_or_else(|_| {
        info!("STS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, MarketDbError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

/// The marketplace schema. Applied idempotently when a pool is created, so an empty
/// database file (or `sqlite::memory:` in tests) is ready to use without a separate
/// migration step.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS organizations (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        kind        TEXT NOT NULL,
        country     TEXT,
        created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS memberships (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        organization_id INTEGER NOT NULL REFERENCES organizations(id),
        user_id         TEXT NOT NULL,
        role            TEXT NOT NULL,
        created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (organization_id, user_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS lots (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        organization_id INTEGER NOT NULL REFERENCES organizations(id),
        title           TEXT NOT NULL,
        description     TEXT,
        volume_amount   REAL NOT NULL,
        volume_unit     TEXT NOT NULL,
        price           REAL NOT NULL,
        price_per_unit  REAL NOT NULL,
        currency        TEXT NOT NULL,
        standards       TEXT NOT NULL DEFAULT '[]',
        status          TEXT NOT NULL DEFAULT 'draft',
        published_at    TEXT,
        expires_at      TEXT,
        created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS bids (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        lot_id            INTEGER NOT NULL REFERENCES lots(id),
        bidder_id         TEXT NOT NULL,
        bidder_name       TEXT,
        bidder_email      TEXT,
        volume_amount     REAL NOT NULL,
        volume_unit       TEXT NOT NULL,
        price             REAL NOT NULL,
        price_per_unit    REAL NOT NULL,
        currency          TEXT NOT NULL,
        message           TEXT,
        delivery_date     TEXT,
        delivery_location TEXT,
        status            TEXT NOT NULL DEFAULT 'pending',
        counter_offer     TEXT,
        external_bid_id   TEXT,
        responded_at      TEXT,
        expires_at        TEXT,
        created_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (lot_id, external_bid_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS contracts (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        contract_number   TEXT NOT NULL UNIQUE,
        lot_id            INTEGER NOT NULL REFERENCES lots(id),
        bid_id            INTEGER NOT NULL REFERENCES bids(id),
        seller_org_id     INTEGER NOT NULL REFERENCES organizations(id),
        buyer_org_id      INTEGER,
        buyer_name        TEXT,
        buyer_email       TEXT,
        title             TEXT,
        description       TEXT,
        terms             TEXT,
        volume_amount     REAL NOT NULL,
        volume_unit       TEXT NOT NULL,
        price             REAL NOT NULL,
        price_per_unit    REAL NOT NULL,
        currency          TEXT NOT NULL,
        delivery_date     TEXT,
        delivery_location TEXT,
        standards         TEXT NOT NULL DEFAULT '[]',
        status            TEXT NOT NULL DEFAULT 'draft',
        signed_by         TEXT,
        signed_at         TEXT,
        completed_at      TEXT,
        created_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS certificates (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        organization_id INTEGER NOT NULL REFERENCES organizations(id),
        lot_id          INTEGER,
        standard        TEXT NOT NULL,
        issuer          TEXT,
        file_name       TEXT,
        status          TEXT NOT NULL DEFAULT 'pending_review',
        valid_until     TEXT,
        created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS one_time_codes (
        email      TEXT PRIMARY KEY,
        code       TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        attempts   INTEGER NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS webhook_outbox (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        event           TEXT NOT NULL,
        payload         TEXT NOT NULL,
        attempts        INTEGER NOT NULL DEFAULT 0,
        next_attempt_at TEXT NOT NULL,
        delivered_at    TEXT,
        dead            INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_bids_lot ON bids (lot_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_outbox_due ON webhook_outbox (dead, delivered_at, next_attempt_at)"#,
];

async fn apply_schema(pool: &SqlitePool) -> Result<(), MarketDbError> {
    for stmt in SCHEMA {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}
