use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use stp_common::{Pricing, Volume};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

//--------------------------------------     LotStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    /// The lot has been created but is not visible to buyers yet.
    Draft,
    /// The lot is live and open for bids.
    Published,
    /// A bid on the lot has been accepted; the lot is held pending contract execution.
    Reserved,
    /// The underlying volume has been delivered and settled.
    Sold,
    /// The lot was withdrawn by its owner.
    Cancelled,
}

impl LotStatus {
    /// Transitions a lot owner may request directly. `Reserved` is only ever entered
    /// through bid acceptance, and `Sold` only from a reserved lot.
    pub fn can_transition_to(&self, next: LotStatus) -> bool {
        use LotStatus::*;
        matches!(
            (self, next),
            (Draft, Published) | (Draft, Cancelled) | (Published, Cancelled) | (Reserved, Sold) | (Reserved, Cancelled)
        )
    }
}

impl Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotStatus::Draft => write!(f, "draft"),
            LotStatus::Published => write!(f, "published"),
            LotStatus::Reserved => write!(f, "reserved"),
            LotStatus::Sold => write!(f, "sold"),
            LotStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for LotStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "reserved" => Ok(Self::Reserved),
            "sold" => Ok(Self::Sold),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------     BidStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    /// Awaiting a response from the lot owner.
    Pending,
    Accepted,
    Rejected,
    /// The bidder pulled the offer before the lot owner responded.
    Withdrawn,
    Expired,
}

impl BidStatus {
    /// True for statuses the lot owner may set directly on a pending bid.
    pub fn is_response(&self) -> bool {
        matches!(self, BidStatus::Accepted | BidStatus::Rejected | BidStatus::Withdrawn)
    }
}

impl Display for BidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BidStatus::Pending => write!(f, "pending"),
            BidStatus::Accepted => write!(f, "accepted"),
            BidStatus::Rejected => write!(f, "rejected"),
            BidStatus::Withdrawn => write!(f, "withdrawn"),
            BidStatus::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for BidStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "withdrawn" => Ok(Self::Withdrawn),
            "expired" => Ok(Self::Expired),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------   ContractStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    PendingSignature,
    Signed,
    Active,
    Completed,
    Cancelled,
}

impl ContractStatus {
    /// Whether a contract may move from `self` to `next`.
    ///
    /// The happy path is draft → pending_signature → signed → active → completed.
    /// `cancelled` is reachable from any non-terminal state.
    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        use ContractStatus::*;
        match (self, next) {
            (Draft, PendingSignature) => true,
            (PendingSignature, Signed) => true,
            (Signed, Active) => true,
            (Active, Completed) => true,
            (Draft | PendingSignature | Signed | Active, Cancelled) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Cancelled)
    }
}

impl Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractStatus::Draft => write!(f, "draft"),
            ContractStatus::PendingSignature => write!(f, "pending_signature"),
            ContractStatus::Signed => write!(f, "signed"),
            ContractStatus::Active => write!(f, "active"),
            ContractStatus::Completed => write!(f, "completed"),
            ContractStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for ContractStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending_signature" => Ok(Self::PendingSignature),
            "signed" => Ok(Self::Signed),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Compliance,
    Buyer,
    Finance,
    Viewer,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Compliance => write!(f, "compliance"),
            Role::Buyer => write!(f, "buyer"),
            Role::Finance => write!(f, "finance"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "compliance" => Ok(Self::Compliance),
            "buyer" => Ok(Self::Buyer),
            "finance" => Ok(Self::Finance),
            "viewer" => Ok(Self::Viewer),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//------------------------------------   OrganizationKind    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrganizationKind {
    Producer,
    Airline,
    Trader,
}

impl Display for OrganizationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrganizationKind::Producer => write!(f, "producer"),
            OrganizationKind::Airline => write!(f, "airline"),
            OrganizationKind::Trader => write!(f, "trader"),
        }
    }
}

//------------------------------------   CertificateStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    PendingReview,
    Valid,
    Expired,
    Rejected,
}

//--------------------------------------    Organization     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub kind: OrganizationKind,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    pub kind: OrganizationKind,
    #[serde(default)]
    pub country: Option<String>,
}

//--------------------------------------     Membership      ---------------------------------------------------------
/// Binds one user identity to one organization with exactly one role.
/// At most one membership exists per (organization, user) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: i64,
    pub organization_id: i64,
    pub user_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Lot          ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Lot {
    pub id: i64,
    pub organization_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub volume_amount: f64,
    pub volume_unit: String,
    pub price: f64,
    pub price_per_unit: f64,
    pub currency: String,
    pub standards: Json<Vec<String>>,
    pub status: LotStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    pub fn volume(&self) -> Volume {
        Volume::new(self.volume_amount, self.volume_unit.clone())
    }

    pub fn pricing(&self) -> Pricing {
        Pricing { price: self.price, price_per_unit: self.price_per_unit, currency: self.currency.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct NewLot {
    pub organization_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub volume: Volume,
    pub pricing: Pricing,
    pub standards: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Fields of a lot its owner may change after creation. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct LotUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub volume: Option<Volume>,
    pub pricing: Option<Pricing>,
    pub standards: Option<Vec<String>>,
    pub status: Option<LotStatus>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LotUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.volume.is_none()
            && self.pricing.is_none()
            && self.standards.is_none()
            && self.status.is_none()
            && self.expires_at.is_none()
    }
}

//--------------------------------------    CounterOffer     ---------------------------------------------------------
/// Terms proposed by the lot owner against a pending bid. Frozen once the bid leaves
/// `pending`; preserved for audit when the counter-offer is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterOffer {
    pub pricing: Pricing,
    pub volume: Volume,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub proposed_at: DateTime<Utc>,
}

//--------------------------------------        Bid          ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Bid {
    pub id: i64,
    pub lot_id: i64,
    pub bidder_id: String,
    pub bidder_name: Option<String>,
    pub bidder_email: Option<String>,
    pub volume_amount: f64,
    pub volume_unit: String,
    pub price: f64,
    pub price_per_unit: f64,
    pub currency: String,
    pub message: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<String>,
    pub status: BidStatus,
    pub counter_offer: Option<Json<CounterOffer>>,
    pub external_bid_id: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    pub fn volume(&self) -> Volume {
        Volume::new(self.volume_amount, self.volume_unit.clone())
    }

    pub fn pricing(&self) -> Pricing {
        Pricing { price: self.price, price_per_unit: self.price_per_unit, currency: self.currency.clone() }
    }

    pub fn counter_offer(&self) -> Option<&CounterOffer> {
        self.counter_offer.as_ref().map(|c| &c.0)
    }
}

#[derive(Debug, Clone)]
pub struct NewBid {
    pub lot_id: i64,
    pub bidder_id: String,
    pub bidder_name: Option<String>,
    pub bidder_email: Option<String>,
    pub volume: Volume,
    pub pricing: Pricing,
    pub message: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<String>,
    pub external_bid_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

//--------------------------------------      Contract       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Contract {
    pub id: i64,
    pub contract_number: String,
    pub lot_id: i64,
    pub bid_id: i64,
    pub seller_org_id: i64,
    pub buyer_org_id: Option<i64>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub volume_amount: f64,
    pub volume_unit: String,
    pub price: f64,
    pub price_per_unit: f64,
    pub currency: String,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<String>,
    pub standards: Json<Vec<String>>,
    pub status: ContractStatus,
    pub signed_by: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn volume(&self) -> Volume {
        Volume::new(self.volume_amount, self.volume_unit.clone())
    }

    pub fn pricing(&self) -> Pricing {
        Pricing { price: self.price, price_per_unit: self.price_per_unit, currency: self.currency.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct NewContract {
    /// Generated when `None`; never regenerated afterwards.
    pub contract_number: Option<String>,
    pub lot_id: i64,
    pub bid_id: i64,
    pub seller_org_id: i64,
    pub buyer_org_id: Option<i64>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub volume: Volume,
    pub pricing: Pricing,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<String>,
    pub standards: Vec<String>,
}

impl NewContract {
    /// Contract terms derived from a bid on a lot. When a counter-offer is supplied
    /// its pricing and volume take precedence over the bid's original terms.
    pub fn from_bid(bid: &Bid, lot: &Lot, counter: Option<&CounterOffer>) -> Self {
        let (volume, pricing) = match counter {
            Some(offer) => (offer.volume.clone(), offer.pricing.clone()),
            None => (bid.volume(), bid.pricing()),
        };
        Self {
            contract_number: None,
            lot_id: lot.id,
            bid_id: bid.id,
            seller_org_id: lot.organization_id,
            buyer_org_id: None,
            buyer_name: bid.bidder_name.clone(),
            buyer_email: bid.bidder_email.clone(),
            title: Some(lot.title.clone()),
            description: lot.description.clone(),
            terms: None,
            volume,
            pricing,
            delivery_date: bid.delivery_date,
            delivery_location: bid.delivery_location.clone(),
            standards: lot.standards.0.clone(),
        }
    }
}

//--------------------------------------     Certificate     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,
    pub organization_id: i64,
    pub lot_id: Option<i64>,
    pub standard: String,
    pub issuer: Option<String>,
    pub file_name: Option<String>,
    pub status: CertificateStatus,
    pub valid_until: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCertificate {
    pub organization_id: i64,
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

//--------------------------------------   WebhookOutboxRow  ---------------------------------------------------------
/// A durably queued notification to the remote dashboard. Written in the same
/// transaction as the state change it describes.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxRow {
    pub id: i64,
    pub event: String,
    pub payload: Json<serde_json::Value>,
    pub attempts: i64,
    pub next_attempt_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub dead: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
