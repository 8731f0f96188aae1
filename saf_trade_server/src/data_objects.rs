//! Wire shapes for the REST endpoints.
//!
//! Requests carry partially specified pricing ([`PricingUpdate`]); the handlers run
//! the platform derivation rule before anything touches storage. Responses reuse the
//! snapshot types from [`saf_trade_engine::api::market_objects`].

use chrono::{DateTime, NaiveDate, Utc};
use saf_trade_engine::db_types::{
    Bid,
    BidStatus,
    Certificate,
    ContractStatus,
    CounterOffer,
    Lot,
    LotStatus,
    LotUpdate,
    NewBid,
    NewCertificate,
    NewLot,
    Role,
};
use serde::{Deserialize, Serialize};
use stp_common::{Pricing, PricingUpdate, Volume};

use crate::errors::ServerError;

//----------------------------------------    Lots    ----------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLotRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub volume: Volume,
    #[serde(flatten)]
    pub pricing: PricingUpdate,
    #[serde(default)]
    pub standards: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewLotRequest {
    pub fn to_new_lot(&self, organization_id: i64) -> Result<NewLot, ServerError> {
        if self.volume.amount <= 0.0 {
            return Err(ServerError::InvalidRequestBody("volume amount must be positive".to_string()));
        }
        let pricing = Pricing::derive(&self.pricing, self.volume.amount)
            .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
        Ok(NewLot {
            organization_id,
            title: self.title.clone(),
            description: self.description.clone(),
            volume: self.volume.clone(),
            pricing,
            standards: self.standards.clone(),
            expires_at: self.expires_at,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLotRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub volume: Option<Volume>,
    #[serde(flatten)]
    pub pricing: PricingUpdate,
    #[serde(default)]
    pub standards: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<LotStatus>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl UpdateLotRequest {
    /// Builds the storage-level update, re-running the pricing derivation whenever
    /// the volume or any price field changes. Unspecified price fields fall back to
    /// the lot's current values.
    pub fn to_lot_update(&self, current: &Lot) -> Result<LotUpdate, ServerError> {
        if let Some(v) = &self.volume {
            if v.amount <= 0.0 {
                return Err(ServerError::InvalidRequestBody("volume amount must be positive".to_string()));
            }
        }
        let pricing = if !self.pricing.is_empty() || self.volume.is_some() {
            let amount = self.volume.as_ref().map(|v| v.amount).unwrap_or(current.volume_amount);
            let mut update = self.pricing.clone();
            if update.price.is_none() && update.price_per_unit.is_none() {
                update.price_per_unit = Some(current.price_per_unit);
            }
            if update.currency.is_none() {
                update.currency = Some(current.currency.clone());
            }
            Some(Pricing::derive(&update, amount).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?)
        } else {
            None
        };
        Ok(LotUpdate {
            title: self.title.clone(),
            description: self.description.clone(),
            volume: self.volume.clone(),
            pricing,
            standards: self.standards.clone(),
            status: self.status,
            expires_at: self.expires_at,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotQueryParams {
    #[serde(default)]
    pub organization_id: Option<i64>,
    #[serde(default)]
    pub status: Option<LotStatus>,
}

//----------------------------------------    Bids    ----------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBidRequest {
    pub lot_id: i64,
    /// Required on the shared-secret path; ignored when a session identifies the bidder.
    #[serde(default)]
    pub bidder_id: Option<String>,
    #[serde(default)]
    pub bidder_name: Option<String>,
    #[serde(default)]
    pub bidder_email: Option<String>,
    pub volume: Volume,
    #[serde(flatten)]
    pub pricing: PricingUpdate,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub delivery_location: Option<String>,
    #[serde(default)]
    pub external_bid_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewBidRequest {
    pub fn to_new_bid(&self, bidder_id: String) -> Result<NewBid, ServerError> {
        if self.volume.amount <= 0.0 {
            return Err(ServerError::InvalidRequestBody("volume amount must be positive".to_string()));
        }
        let pricing = Pricing::derive(&self.pricing, self.volume.amount)
            .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
        Ok(NewBid {
            lot_id: self.lot_id,
            bidder_id,
            bidder_name: self.bidder_name.clone(),
            bidder_email: self.bidder_email.clone(),
            volume: self.volume.clone(),
            pricing,
            message: self.message.clone(),
            delivery_date: self.delivery_date,
            delivery_location: self.delivery_location.clone(),
            external_bid_id: self.external_bid_id.clone(),
            expires_at: self.expires_at,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidQueryParams {
    #[serde(default)]
    pub lot_id: Option<i64>,
    #[serde(default)]
    pub status: Option<BidStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterOfferRequest {
    #[serde(flatten)]
    pub pricing: PricingUpdate,
    #[serde(default)]
    pub volume: Option<Volume>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CounterOfferRequest {
    /// The counter-offer's own derivation: per-unit price wins, the volume defaults
    /// to the bid's volume when the seller does not counter on quantity.
    pub fn to_counter_offer(&self, bid: &Bid) -> Result<CounterOffer, ServerError> {
        let volume = self.volume.clone().unwrap_or_else(|| bid.volume());
        if volume.amount <= 0.0 {
            return Err(ServerError::InvalidRequestBody("volume amount must be positive".to_string()));
        }
        let mut update = self.pricing.clone();
        if update.currency.is_none() {
            update.currency = Some(bid.currency.clone());
        }
        let pricing =
            Pricing::derive(&update, volume.amount).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
        Ok(CounterOffer { pricing, volume, message: self.message.clone(), proposed_at: Utc::now() })
    }
}

/// The body of `PUT /bids/{id}`: either a status response or a counter-offer,
/// never both.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidUpdateRequest {
    #[serde(default)]
    pub status: Option<BidStatus>,
    #[serde(default)]
    pub counter_offer: Option<CounterOfferRequest>,
}

//----------------------------------------  Contracts  ----------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContractRequest {
    pub bid_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub delivery_location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractRequest {
    pub status: ContractStatus,
    #[serde(default)]
    pub signer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractQueryParams {
    #[serde(default)]
    pub status: Option<ContractStatus>,
}

//----------------------------------------   Members   ----------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMemberRequest {
    pub user_id: String,
    pub role: Role,
}

//----------------------------------------    Auth     ----------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
}

//---------------------------------------- Certificates ----------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCertificateRequest {
    #[serde(default)]
    pub lot_id: Option<i64>,
    pub standard: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

impl NewCertificateRequest {
    pub fn to_new_certificate(&self, organization_id: i64) -> NewCertificate {
        NewCertificate {
            organization_id,
            lot_id: self.lot_id,
            standard: self.standard.clone(),
            issuer: self.issuer.clone(),
            file_name: self.file_name.clone(),
            valid_until: self.valid_until,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateQueryParams {
    #[serde(default)]
    pub organization_id: Option<i64>,
    #[serde(default)]
    pub lot_id: Option<i64>,
}

/// Per-file outcome of a bulk certificate upload. Successes carry the stored
/// certificate; failures carry the error and echo the submitted file name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCertificateResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl BulkCertificateResult {
    pub fn stored(certificate: Certificate) -> Self {
        Self { success: true, certificate: Some(certificate), error: None, filename: None }
    }

    pub fn failed(error: String, filename: Option<String>) -> Self {
        Self { success: false, certificate: None, error: Some(error), filename }
    }
}
