use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Lot, LotStatus, LotUpdate, NewLot},
    traits::{LotQueryFilter, MarketDbError},
};

pub async fn insert_lot(lot: NewLot, conn: &mut SqliteConnection) -> Result<Lot, MarketDbError> {
    let now = Utc::now();
    let created = sqlx::query_as::<_, Lot>(
        r#"
            INSERT INTO lots (
                organization_id, title, description,
                volume_amount, volume_unit,
                price, price_per_unit, currency,
                standards, status, expires_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'draft', $10, $11, $11)
            RETURNING *
        "#,
    )
    .bind(lot.organization_id)
    .bind(&lot.title)
    .bind(&lot.description)
    .bind(lot.volume.amount)
    .bind(&lot.volume.unit)
    .bind(lot.pricing.price)
    .bind(lot.pricing.price_per_unit)
    .bind(&lot.pricing.currency)
    .bind(Json(lot.standards.clone()))
    .bind(lot.expires_at)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub async fn fetch_lot(id: i64, conn: &mut SqliteConnection) -> Result<Option<Lot>, MarketDbError> {
    let lot = sqlx::query_as::<_, Lot>("SELECT * FROM lots WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(lot)
}

/// Fetches lots matching the filter, newest first.
pub async fn fetch_lots(filter: LotQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Lot>, MarketDbError> {
    let mut builder = QueryBuilder::new("SELECT * FROM lots ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(org_id) = filter.organization_id {
        where_clause.push("organization_id = ");
        where_clause.push_bind_unseparated(org_id);
    }
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("📦️ Executing query: {}", builder.sql());
    let lots = builder.build_query_as::<Lot>().fetch_all(conn).await?;
    Ok(lots)
}

/// Applies the field changes in `update`, guarded on the lot still having
/// `expected` status. `stamp_published` additionally records `published_at`.
/// Returns false when the guard failed (the lot changed underneath us).
pub async fn apply_update(
    id: i64,
    update: &LotUpdate,
    expected: LotStatus,
    stamp_published: bool,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketDbError> {
    let now = Utc::now();
    let mut builder = QueryBuilder::new("UPDATE lots SET ");
    let mut set_clause = builder.separated(", ");
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(now);
    if let Some(title) = &update.title {
        set_clause.push("title = ");
        set_clause.push_bind_unseparated(title.clone());
    }
    if let Some(description) = &update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description.clone());
    }
    if let Some(volume) = &update.volume {
        set_clause.push("volume_amount = ");
        set_clause.push_bind_unseparated(volume.amount);
        set_clause.push("volume_unit = ");
        set_clause.push_bind_unseparated(volume.unit.clone());
    }
    if let Some(pricing) = &update.pricing {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(pricing.price);
        set_clause.push("price_per_unit = ");
        set_clause.push_bind_unseparated(pricing.price_per_unit);
        set_clause.push("currency = ");
        set_clause.push_bind_unseparated(pricing.currency.clone());
    }
    if let Some(standards) = &update.standards {
        set_clause.push("standards = ");
        set_clause.push_bind_unseparated(Json(standards.clone()));
    }
    if let Some(status) = update.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status.to_string());
    }
    if stamp_published {
        set_clause.push("published_at = ");
        set_clause.push_bind_unseparated(now);
    }
    if let Some(expires_at) = update.expires_at {
        set_clause.push("expires_at = ");
        set_clause.push_bind_unseparated(expires_at);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND status = ");
    builder.push_bind(expected.to_string());
    trace!("📦️ Executing query: {}", builder.sql());
    let res = builder.build().execute(conn).await?;
    Ok(res.rows_affected() == 1)
}

/// Single conditional status write. Returns false if the lot was not in `from`.
pub async fn try_transition(
    id: i64,
    from: LotStatus,
    to: LotStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketDbError> {
    let res = sqlx::query("UPDATE lots SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4")
        .bind(to.to_string())
        .bind(now)
        .bind(id)
        .bind(from.to_string())
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn delete_lot(id: i64, conn: &mut SqliteConnection) -> Result<bool, MarketDbError> {
    let res = sqlx::query("DELETE FROM lots WHERE id = $1").bind(id).execute(conn).await?;
    Ok(res.rows_affected() == 1)
}
