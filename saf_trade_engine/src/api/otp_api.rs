use std::{fmt::Debug, time::Duration};

use chrono::Utc;
use log::*;

use crate::{
    helpers::new_otp_code,
    traits::{MarketDbError, OtpManagement, OtpVerification},
};

/// Codes are live for ten minutes.
pub const OTP_TTL: Duration = Duration::from_secs(600);
/// A code dies after five wrong guesses.
pub const OTP_MAX_ATTEMPTS: i64 = 5;

/// One-time login codes. The API issues and verifies codes; delivering them to the
/// user's inbox is the caller's problem.
pub struct OtpApi<B> {
    db: B,
}

impl<B> Debug for OtpApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OtpApi")
    }
}

impl<B> OtpApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OtpApi<B>
where B: OtpManagement
{
    /// Issues a fresh code for the email, replacing any outstanding one and
    /// resetting the attempt counter. Returns the code for delivery.
    pub async fn issue(&self, email: &str) -> Result<String, MarketDbError> {
        let code = new_otp_code();
        let expires_at = Utc::now() + chrono::Duration::seconds(OTP_TTL.as_secs() as i64);
        self.db.upsert_otp(email, &code, expires_at).await?;
        debug!("🔑️ Issued login code for {email}, valid until {expires_at}");
        Ok(code)
    }

    /// Verifies a code. A successful match consumes the code; a wrong guess burns an
    /// attempt; expired or over-budget codes never verify.
    pub async fn verify(&self, email: &str, code: &str) -> Result<OtpVerification, MarketDbError> {
        let outcome = self.db.verify_otp(email, code, OTP_MAX_ATTEMPTS).await?;
        if outcome != OtpVerification::Verified {
            info!("🔑️ Failed login code verification for {email}: {outcome:?}");
        }
        Ok(outcome)
    }
}
