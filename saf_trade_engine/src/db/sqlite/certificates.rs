use chrono::Utc;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Certificate, NewCertificate},
    traits::MarketDbError,
};

pub async fn insert_certificate(
    cert: NewCertificate,
    conn: &mut SqliteConnection,
) -> Result<Certificate, MarketDbError> {
    let created = sqlx::query_as::<_, Certificate>(
        r#"
            INSERT INTO certificates (organization_id, lot_id, standard, issuer, file_name, status, valid_until, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending_review', $6, $7)
            RETURNING *
        "#,
    )
    .bind(cert.organization_id)
    .bind(cert.lot_id)
    .bind(&cert.standard)
    .bind(&cert.issuer)
    .bind(&cert.file_name)
    .bind(cert.valid_until)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub async fn fetch_certificates(
    organization_id: Option<i64>,
    lot_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Certificate>, MarketDbError> {
    let mut builder = QueryBuilder::new("SELECT * FROM certificates ");
    if organization_id.is_some() || lot_id.is_some() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(org_id) = organization_id {
        where_clause.push("organization_id = ");
        where_clause.push_bind_unseparated(org_id);
    }
    if let Some(lot_id) = lot_id {
        where_clause.push("lot_id = ");
        where_clause.push_bind_unseparated(lot_id);
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("📜️ Executing query: {}", builder.sql());
    let certs = builder.build_query_as::<Certificate>().fetch_all(conn).await?;
    Ok(certs)
}
