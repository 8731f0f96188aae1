use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Bid, BidStatus, CounterOffer, NewBid},
    traits::{BidQueryFilter, InsertBidResult, MarketDbError},
};

/// Inserts a new pending bid. When `external_bid_id` is present and a bid with the
/// same (lot, external id) pair already exists, nothing is written and the original
/// bid is returned, making cross-system ingestion idempotent. The (lot, external id)
/// unique index is the arbiter, so concurrent submissions cannot both insert.
pub async fn idempotent_insert(bid: NewBid, conn: &mut SqliteConnection) -> Result<InsertBidResult, MarketDbError> {
    let lot_id = bid.lot_id;
    let ext_id = bid.external_bid_id.clone();
    match insert_bid(bid, conn).await {
        Ok(created) => Ok(InsertBidResult::Inserted(Box::new(created))),
        Err(MarketDbError::Database(e))
            if e.as_database_error()
                .map(|db| db.kind() == sqlx::error::ErrorKind::UniqueViolation)
                .unwrap_or(false) =>
        {
            let Some(ext_id) = ext_id else {
                return Err(e.into());
            };
            let existing = fetch_by_external_id(lot_id, &ext_id, conn)
                .await?
                .ok_or(MarketDbError::Database(e))?;
            debug!("🤝️ Bid with external id {ext_id} on lot {lot_id} already exists as #{}", existing.id);
            Ok(InsertBidResult::AlreadyExists(Box::new(existing)))
        },
        Err(e) => Err(e),
    }
}

async fn insert_bid(bid: NewBid, conn: &mut SqliteConnection) -> Result<Bid, MarketDbError> {
    let now = Utc::now();
    let created = sqlx::query_as::<_, Bid>(
        r#"
            INSERT INTO bids (
                lot_id, bidder_id, bidder_name, bidder_email,
                volume_amount, volume_unit,
                price, price_per_unit, currency,
                message, delivery_date, delivery_location,
                status, external_bid_id, expires_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending', $13, $14, $15, $15)
            RETURNING *
        "#,
    )
    .bind(bid.lot_id)
    .bind(&bid.bidder_id)
    .bind(&bid.bidder_name)
    .bind(&bid.bidder_email)
    .bind(bid.volume.amount)
    .bind(&bid.volume.unit)
    .bind(bid.pricing.price)
    .bind(bid.pricing.price_per_unit)
    .bind(&bid.pricing.currency)
    .bind(&bid.message)
    .bind(bid.delivery_date)
    .bind(&bid.delivery_location)
    .bind(&bid.external_bid_id)
    .bind(bid.expires_at)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub async fn fetch_bid(id: i64, conn: &mut SqliteConnection) -> Result<Option<Bid>, MarketDbError> {
    let bid = sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(bid)
}

pub async fn fetch_by_external_id(
    lot_id: i64,
    external_bid_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Bid>, MarketDbError> {
    let bid = sqlx::query_as::<_, Bid>("SELECT * FROM bids WHERE lot_id = $1 AND external_bid_id = $2")
        .bind(lot_id)
        .bind(external_bid_id)
        .fetch_optional(conn)
        .await?;
    Ok(bid)
}

/// Fetches bids matching the filter, newest first.
pub async fn fetch_bids(filter: BidQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Bid>, MarketDbError> {
    let mut builder = QueryBuilder::new("SELECT * FROM bids ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(lot_id) = filter.lot_id {
        where_clause.push("lot_id = ");
        where_clause.push_bind_unseparated(lot_id);
    }
    if let Some(bidder_id) = &filter.bidder_id {
        where_clause.push("bidder_id = ");
        where_clause.push_bind_unseparated(bidder_id.clone());
    }
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("🤝️ Executing query: {}", builder.sql());
    let bids = builder.build_query_as::<Bid>().fetch_all(conn).await?;
    Ok(bids)
}

/// Moves a bid out of `pending` in one conditional write, stamping `responded_at`.
/// Returns false when the bid was not pending any more — the caller reports the
/// conflict instead of applying the transition twice.
pub async fn try_resolve(
    id: i64,
    to: BidStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketDbError> {
    let res = sqlx::query(
        "UPDATE bids SET status = $1, responded_at = $2, updated_at = $2 WHERE id = $3 AND status = 'pending'",
    )
    .bind(to.to_string())
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Attaches (or replaces) a counter-offer, conditional on the bid still being
/// pending. Status is left untouched.
pub async fn try_attach_counter_offer(
    id: i64,
    offer: &CounterOffer,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketDbError> {
    let res = sqlx::query("UPDATE bids SET counter_offer = $1, updated_at = $2 WHERE id = $3 AND status = 'pending'")
        .bind(Json(offer.clone()))
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}
