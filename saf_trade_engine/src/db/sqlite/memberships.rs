use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Membership, NewOrganization, Organization, Role},
    traits::MarketDbError,
};

pub async fn insert_organization(
    org: NewOrganization,
    conn: &mut SqliteConnection,
) -> Result<Organization, MarketDbError> {
    let created = sqlx::query_as::<_, Organization>(
        "INSERT INTO organizations (name, kind, country, created_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&org.name)
    .bind(org.kind)
    .bind(&org.country)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(created)
}

pub async fn fetch_organization(id: i64, conn: &mut SqliteConnection) -> Result<Option<Organization>, MarketDbError> {
    let org = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(org)
}

/// Adds a membership. The (organization, user) unique index turns a duplicate into
/// a [`MarketDbError::DuplicateMembership`].
pub async fn insert_membership(
    organization_id: i64,
    user_id: &str,
    role: Role,
    conn: &mut SqliteConnection,
) -> Result<Membership, MarketDbError> {
    let result = sqlx::query_as::<_, Membership>(
        "INSERT INTO memberships (organization_id, user_id, role, created_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(role)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(membership) => {
            debug!("🧑️ User {user_id} joined organization {organization_id} as {role}");
            Ok(membership)
        },
        Err(e)
            if e.as_database_error()
                .map(|db| db.kind() == sqlx::error::ErrorKind::UniqueViolation)
                .unwrap_or(false) =>
        {
            Err(MarketDbError::DuplicateMembership { organization_id, user_id: user_id.to_string() })
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn remove_membership(
    organization_id: i64,
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketDbError> {
    let res = sqlx::query("DELETE FROM memberships WHERE organization_id = $1 AND user_id = $2")
        .bind(organization_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// The membership this user identity acts through. Users are expected to belong to
/// a single organization; if data ever violates that, the oldest membership wins.
pub async fn membership_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Membership>, MarketDbError> {
    let membership =
        sqlx::query_as::<_, Membership>("SELECT * FROM memberships WHERE user_id = $1 ORDER BY id ASC LIMIT 1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    Ok(membership)
}

pub async fn memberships_for_organization(
    organization_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Membership>, MarketDbError> {
    let members = sqlx::query_as::<_, Membership>("SELECT * FROM memberships WHERE organization_id = $1 ORDER BY id")
        .bind(organization_id)
        .fetch_all(conn)
        .await?;
    Ok(members)
}
