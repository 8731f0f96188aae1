use chrono::{DateTime, Utc};

use crate::traits::{MarketDbError, OtpVerification};

/// Short-lived one-time login codes, keyed by email.
///
/// This replaces stashing codes in identity-provider user metadata: codes live in a
/// dedicated table with an explicit TTL and attempt counter, and verification is an
/// atomic check-and-increment rather than a read-modify-write.
#[allow(async_fn_in_trait)]
pub trait OtpManagement {
    /// Stores a fresh code for the email, replacing any previous one and resetting
    /// the attempt counter.
    async fn upsert_otp(&self, email: &str, code: &str, expires_at: DateTime<Utc>) -> Result<(), MarketDbError>;

    /// Verifies a code in a single conditional statement. A successful match consumes
    /// the code; a mismatch burns one attempt. Expired codes and codes over the
    /// attempt budget never verify.
    async fn verify_otp(&self, email: &str, code: &str, max_attempts: i64) -> Result<OtpVerification, MarketDbError>;
}
