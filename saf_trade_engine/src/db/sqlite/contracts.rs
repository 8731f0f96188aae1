use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Contract, ContractStatus, NewContract},
    helpers::{new_contract_number, CONTRACT_NUMBER_ATTEMPTS},
    traits::{ContractQueryFilter, MarketDbError},
};

/// Inserts a contract, generating a unique contract number when none was supplied.
///
/// The number format (`CNT-<year>-<4 digits>`) has a small random space, so a
/// unique-constraint collision is expected occasionally; we retry with a fresh
/// number rather than failing the acceptance. A caller-supplied number is never
/// retried — a collision there is a real conflict.
pub async fn insert_with_unique_number(
    contract: NewContract,
    conn: &mut SqliteConnection,
) -> Result<Contract, MarketDbError> {
    let explicit = contract.contract_number.is_some();
    let attempts = if explicit { 1 } else { CONTRACT_NUMBER_ATTEMPTS };
    for attempt in 0..attempts {
        let number = contract.contract_number.clone().unwrap_or_else(new_contract_number);
        match insert_contract(&contract, &number, &mut *conn).await {
            Ok(created) => {
                debug!("📑️ Contract {number} created for bid {}", contract.bid_id);
                return Ok(created);
            },
            Err(MarketDbError::Database(e)) if is_unique_violation(&e) && !explicit => {
                warn!("📑️ Contract number {number} collided (attempt {}). Retrying.", attempt + 1);
            },
            Err(e) => return Err(e),
        }
    }
    Err(MarketDbError::ContractNumberExhausted(attempts))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().map(|db| db.kind() == sqlx::error::ErrorKind::UniqueViolation).unwrap_or(false)
}

async fn insert_contract(
    contract: &NewContract,
    number: &str,
    conn: &mut SqliteConnection,
) -> Result<Contract, MarketDbError> {
    let now = Utc::now();
    let created = sqlx::query_as::<_, Contract>(
        r#"
            INSERT INTO contracts (
                contract_number, lot_id, bid_id, seller_org_id,
                buyer_org_id, buyer_name, buyer_email,
                title, description, terms,
                volume_amount, volume_unit,
                price, price_per_unit, currency,
                delivery_date, delivery_location, standards,
                status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
                      'draft', $19, $19)
            RETURNING *
        "#,
    )
    .bind(number)
    .bind(contract.lot_id)
    .bind(contract.bid_id)
    .bind(contract.seller_org_id)
    .bind(contract.buyer_org_id)
    .bind(&contract.buyer_name)
    .bind(&contract.buyer_email)
    .bind(&contract.title)
    .bind(&contract.description)
    .bind(&contract.terms)
    .bind(contract.volume.amount)
    .bind(&contract.volume.unit)
    .bind(contract.pricing.price)
    .bind(contract.pricing.price_per_unit)
    .bind(&contract.pricing.currency)
    .bind(contract.delivery_date)
    .bind(&contract.delivery_location)
    .bind(Json(contract.standards.clone()))
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub async fn fetch_contract(id: i64, conn: &mut SqliteConnection) -> Result<Option<Contract>, MarketDbError> {
    let contract =
        sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(contract)
}

/// Fetches contracts matching the filter, newest first. The organization filter
/// matches both sides of the trade.
pub async fn fetch_contracts(
    filter: ContractQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Contract>, MarketDbError> {
    let mut builder = QueryBuilder::new("SELECT * FROM contracts ");
    let has_filter = filter.organization_id.is_some() || filter.status.is_some();
    if has_filter {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(org_id) = filter.organization_id {
        where_clause.push("(seller_org_id = ");
        where_clause.push_bind_unseparated(org_id);
        where_clause.push_unseparated(" OR buyer_org_id = ");
        where_clause.push_bind_unseparated(org_id);
        where_clause.push_unseparated(")");
    }
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("📑️ Executing query: {}", builder.sql());
    let contracts = builder.build_query_as::<Contract>().fetch_all(conn).await?;
    Ok(contracts)
}

/// Conditional signature-lifecycle write. Stamps `signed_at` when moving to
/// `signed` and `completed_at` when moving to `completed`; records the signer on
/// the signature step. Returns false when the stored status was not `from`.
pub async fn try_transition(
    id: i64,
    from: ContractStatus,
    to: ContractStatus,
    signer: Option<&str>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketDbError> {
    let mut builder = QueryBuilder::new("UPDATE contracts SET ");
    let mut set_clause = builder.separated(", ");
    set_clause.push("status = ");
    set_clause.push_bind_unseparated(to.to_string());
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(now);
    if to == ContractStatus::Signed {
        set_clause.push("signed_at = ");
        set_clause.push_bind_unseparated(now);
        if let Some(signer) = signer {
            set_clause.push("signed_by = ");
            set_clause.push_bind_unseparated(signer.to_string());
        }
    }
    if to == ContractStatus::Completed {
        set_clause.push("completed_at = ");
        set_clause.push_bind_unseparated(now);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND status = ");
    builder.push_bind(from.to_string());
    let res = builder.build().execute(conn).await?;
    Ok(res.rows_affected() == 1)
}
