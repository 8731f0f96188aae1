//! Wire-facing views of the marketplace records.
//!
//! These are the shapes returned by the HTTP API and embedded in webhook payloads:
//! ids are stringified, dates are ISO-8601, and volume/pricing are nested objects
//! rather than the flattened columns the database stores.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stp_common::{Pricing, Volume};

use crate::db_types::{Bid, BidStatus, Contract, ContractStatus, CounterOffer, Lot, LotStatus};

/// Webhook event names understood by the remote dashboard.
pub mod events {
    pub const BID_ACCEPTED: &str = "bid.accepted";
    pub const BID_REJECTED: &str = "bid.rejected";
    pub const BID_COUNTER_OFFER: &str = "bid.counter_offer";
    pub const LOT_CREATED: &str = "lot.created";
    pub const LOT_UPDATED: &str = "lot.updated";
    pub const LOT_DELETED: &str = "lot.deleted";
    pub const LOT_PUBLISHED: &str = "lot.published";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSnapshot {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub volume: Volume,
    pub pricing: Pricing,
    pub standards: Vec<String>,
    pub status: LotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Lot> for LotSnapshot {
    fn from(lot: &Lot) -> Self {
        Self {
            id: lot.id.to_string(),
            organization_id: lot.organization_id.to_string(),
            title: lot.title.clone(),
            description: lot.description.clone(),
            volume: lot.volume(),
            pricing: lot.pricing(),
            standards: lot.standards.0.clone(),
            status: lot.status,
            published_at: lot.published_at,
            expires_at: lot.expires_at,
            created_at: lot.created_at,
            updated_at: lot.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidSnapshot {
    pub id: String,
    pub lot_id: String,
    pub bidder_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidder_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidder_email: Option<String>,
    pub volume: Volume,
    pub pricing: Pricing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<String>,
    pub status: BidStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_offer: Option<CounterOffer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_bid_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Bid> for BidSnapshot {
    fn from(bid: &Bid) -> Self {
        Self {
            id: bid.id.to_string(),
            lot_id: bid.lot_id.to_string(),
            bidder_id: bid.bidder_id.clone(),
            bidder_name: bid.bidder_name.clone(),
            bidder_email: bid.bidder_email.clone(),
            volume: bid.volume(),
            pricing: bid.pricing(),
            message: bid.message.clone(),
            delivery_date: bid.delivery_date,
            delivery_location: bid.delivery_location.clone(),
            status: bid.status,
            counter_offer: bid.counter_offer().cloned(),
            external_bid_id: bid.external_bid_id.clone(),
            responded_at: bid.responded_at,
            expires_at: bid.expires_at,
            created_at: bid.created_at,
            updated_at: bid.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSnapshot {
    pub id: String,
    pub contract_number: String,
    pub lot_id: String,
    pub bid_id: String,
    pub seller_org_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
    pub volume: Volume,
    pub pricing: Pricing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<String>,
    pub standards: Vec<String>,
    pub status: ContractStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Contract> for ContractSnapshot {
    fn from(contract: &Contract) -> Self {
        Self {
            id: contract.id.to_string(),
            contract_number: contract.contract_number.clone(),
            lot_id: contract.lot_id.to_string(),
            bid_id: contract.bid_id.to_string(),
            seller_org_id: contract.seller_org_id.to_string(),
            buyer_org_id: contract.buyer_org_id.map(|id| id.to_string()),
            buyer_name: contract.buyer_name.clone(),
            buyer_email: contract.buyer_email.clone(),
            title: contract.title.clone(),
            description: contract.description.clone(),
            terms: contract.terms.clone(),
            volume: contract.volume(),
            pricing: contract.pricing(),
            delivery_date: contract.delivery_date,
            delivery_location: contract.delivery_location.clone(),
            standards: contract.standards.0.clone(),
            status: contract.status,
            signed_by: contract.signed_by.clone(),
            signed_at: contract.signed_at,
            completed_at: contract.completed_at,
            created_at: contract.created_at,
            updated_at: contract.updated_at,
        }
    }
}
