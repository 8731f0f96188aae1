use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::traits::{MarketDbError, OtpVerification};

/// Stores a fresh code for the email, replacing any previous code and resetting the
/// attempt counter.
pub async fn upsert_code(
    email: &str,
    code: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), MarketDbError> {
    sqlx::query(
        r#"
            INSERT INTO one_time_codes (email, code, expires_at, attempts) VALUES ($1, $2, $3, 0)
            ON CONFLICT (email) DO UPDATE SET code = excluded.code, expires_at = excluded.expires_at, attempts = 0
        "#,
    )
    .bind(email)
    .bind(code)
    .bind(expires_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Atomic check-and-increment verification.
///
/// A single conditional UPDATE burns one attempt and returns the stored code only
/// while the code is live and under the attempt budget; the comparison then happens
/// on the returned value. Two concurrent verifications therefore each consume an
/// attempt, and neither can exceed the budget.
pub async fn verify_code(
    email: &str,
    code: &str,
    max_attempts: i64,
    conn: &mut SqliteConnection,
) -> Result<OtpVerification, MarketDbError> {
    let now = Utc::now();
    let row: Option<(String,)> = sqlx::query_as(
        r#"
            UPDATE one_time_codes SET attempts = attempts + 1
            WHERE email = $1 AND expires_at > $2 AND attempts < $3
            RETURNING code
        "#,
    )
    .bind(email)
    .bind(now)
    .bind(max_attempts)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some((stored,)) if stored == code => {
            // consume the code so it cannot be replayed
            sqlx::query("DELETE FROM one_time_codes WHERE email = $1").bind(email).execute(conn).await?;
            debug!("🔑️ One-time code verified for {email}");
            Ok(OtpVerification::Verified)
        },
        Some(_) => Ok(OtpVerification::WrongCode),
        None => {
            // Distinguish a spent attempt budget from a missing/expired code.
            let exhausted: Option<(i64,)> =
                sqlx::query_as("SELECT attempts FROM one_time_codes WHERE email = $1 AND expires_at > $2")
                    .bind(email)
                    .bind(now)
                    .fetch_optional(conn)
                    .await?;
            match exhausted {
                Some((attempts,)) if attempts >= max_attempts => Ok(OtpVerification::TooManyAttempts),
                _ => Ok(OtpVerification::NoActiveCode),
            }
        },
    }
}
