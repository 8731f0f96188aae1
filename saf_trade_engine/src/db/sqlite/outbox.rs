use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::SqliteConnection;

use crate::{
    api::market_objects::{BidSnapshot, ContractSnapshot, LotSnapshot},
    db_types::{Bid, Contract, Lot, OutboxRow},
    traits::MarketDbError,
};

/// Builds the payload for a lot lifecycle event.
pub fn lot_payload(event: &str, lot: &Lot) -> Value {
    json!({
        "event": event,
        "timestamp": Utc::now(),
        "lot": LotSnapshot::from(lot),
    })
}

/// Builds the payload for a bid lifecycle event. The lot the bid belongs to is
/// always included so the receiver does not have to chase references.
pub fn bid_payload(event: &str, bid: &Bid, lot: &Lot, contract: Option<&Contract>) -> Value {
    let mut payload = json!({
        "event": event,
        "timestamp": Utc::now(),
        "bid": BidSnapshot::from(bid),
        "lot": LotSnapshot::from(lot),
    });
    if let Some(contract) = contract {
        payload["contract"] = serde_json::to_value(ContractSnapshot::from(contract)).unwrap_or(Value::Null);
    }
    payload
}

/// Adds a notification to the outbox. Callers run this inside the same transaction
/// as the state change it announces, so a rolled-back change never notifies.
pub async fn enqueue(event: &str, payload: &Value, conn: &mut SqliteConnection) -> Result<i64, MarketDbError> {
    let now = Utc::now();
    let id = sqlx::query_scalar::<_, i64>(
        r#"INSERT INTO webhook_outbox (event, payload, attempts, next_attempt_at, created_at, updated_at)
           VALUES (?, ?, 0, ?, ?, ?) RETURNING id"#,
    )
    .bind(event)
    .bind(payload)
    .bind(now)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Returns undelivered, non-dead rows whose retry time has passed, oldest first.
pub async fn fetch_due(limit: i64, now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<OutboxRow>, MarketDbError> {
    let rows = sqlx::query_as::<_, OutboxRow>(
        r#"SELECT * FROM webhook_outbox
           WHERE delivered_at IS NULL AND dead = 0 AND next_attempt_at <= ?
           ORDER BY id LIMIT ?"#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn mark_delivered(id: i64, now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<(), MarketDbError> {
    sqlx::query("UPDATE webhook_outbox SET delivered_at = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn mark_failed(
    id: i64,
    next_attempt_at: DateTime<Utc>,
    dead: bool,
    conn: &mut SqliteConnection,
) -> Result<(), MarketDbError> {
    sqlx::query(
        "UPDATE webhook_outbox SET attempts = attempts + 1, next_attempt_at = ?, dead = ?, updated_at = ? WHERE id = ?",
    )
    .bind(next_attempt_at)
    .bind(dead)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}
