//! Session authentication.
//!
//! The OTP verify endpoint issues a compact HMAC-SHA256 signed token:
//! `base64url(claims JSON) . base64url(mac)`. The claims carry the user identity,
//! their (optional) organization membership, and an expiry. No server-side session
//! state exists; the signature is the session.

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::*;
use saf_trade_engine::db_types::{Membership, Role};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use stp_common::Secret;

use crate::{
    config::{AuthConfig, SESSION_TTL},
    errors::{AuthError, ServerError},
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The authenticated user identity (their email).
    pub sub: String,
    /// The organization the user acts for, when they have a membership.
    pub organization_id: Option<i64>,
    pub role: Option<Role>,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(email: &str, membership: Option<&Membership>) -> Self {
        let exp = (Utc::now() + SESSION_TTL).timestamp();
        Self {
            sub: email.to_string(),
            organization_id: membership.map(|m| m.organization_id),
            role: membership.map(|m| m.role),
            exp,
        }
    }
}

/// Signs and validates session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Secret<String>,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.session_secret.clone() }
    }

    pub fn issue(&self, claims: &SessionClaims) -> Result<String, ServerError> {
        let body = serde_json::to_vec(claims).map_err(|e| ServerError::Unspecified(e.to_string()))?;
        let payload = base64::encode_config(body, base64::URL_SAFE_NO_PAD);
        let mac = self.sign(payload.as_bytes())?;
        Ok(format!("{payload}.{mac}"))
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let (payload, mac) = token
            .split_once('.')
            .ok_or_else(|| AuthError::PoorlyFormattedToken("missing signature separator".to_string()))?;
        let mac = base64::decode_config(mac, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let mut hmac = self.keyed_mac().map_err(|e| AuthError::ValidationError(e.to_string()))?;
        hmac.update(payload.as_bytes());
        hmac.verify_slice(&mac).map_err(|e| AuthError::ValidationError(e.to_string()))?;
        let body = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let claims =
            serde_json::from_slice::<SessionClaims>(&body).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        if claims.exp < Utc::now().timestamp() {
            return Err(AuthError::ExpiredToken);
        }
        Ok(claims)
    }

    fn sign(&self, data: &[u8]) -> Result<String, ServerError> {
        let mut hmac = self.keyed_mac().map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
        hmac.update(data);
        let mac = hmac.finalize().into_bytes();
        Ok(base64::encode_config(mac, base64::URL_SAFE_NO_PAD))
    }

    fn keyed_mac(&self) -> Result<HmacSha256, hmac::digest::InvalidLength> {
        HmacSha256::new_from_slice(self.secret.reveal().as_bytes())
    }
}

/// The authenticated caller, extracted from the `Authorization: Bearer` header.
/// Handlers take this as an argument to require a valid session.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: SessionClaims,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }

    /// The caller's organization, or a 403 when they have none.
    pub fn org_id(&self) -> Result<i64, ServerError> {
        self.claims.organization_id.ok_or(ServerError::AuthenticationError(AuthError::NoOrganization))
    }

}

impl FromRequest for AuthContext {
    type Error = ServerError;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        std::future::ready(extract_auth_context(req))
    }
}

fn extract_auth_context(req: &HttpRequest) -> Result<AuthContext, ServerError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::InitializeError("TokenIssuer is not configured".to_string()))?;
    let token = bearer_token(req).ok_or(ServerError::AuthenticationError(AuthError::MissingToken))?;
    let claims = issuer.validate(&token).map_err(|e| {
        debug!("🔑️ Rejected session token: {e}");
        ServerError::AuthenticationError(e)
    })?;
    Ok(AuthContext { claims })
}

/// A session context if the request carries a valid session token, `None` otherwise.
/// Used on endpoints that accept either a session or the shared API key.
pub fn maybe_auth_context(req: &HttpRequest) -> Option<AuthContext> {
    extract_auth_context(req).ok()
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
}

/// Checks the shared API key on machine-to-machine requests. The key may arrive as
/// `X-API-Key` or as a bearer token. A server without a configured key accepts
/// everything.
pub fn shared_secret_ok(req: &HttpRequest, api_key: &Option<Secret<String>>) -> bool {
    let Some(key) = api_key else {
        return true;
    };
    let presented = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .or_else(|| bearer_token(req));
    match presented {
        Some(presented) => presented == *key.reveal(),
        None => false,
    }
}
