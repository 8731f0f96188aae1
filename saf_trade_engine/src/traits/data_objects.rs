use serde::{Deserialize, Serialize};

use crate::db_types::{Bid, BidStatus, Contract, ContractStatus, Lot, LotStatus};

/// Result of an idempotent bid insert. A duplicate `(external_bid_id, lot_id)` pair
/// returns the bid that was stored first so callers can report the conflict without
/// creating a second record.
#[derive(Debug)]
pub enum InsertBidResult {
    Inserted(Box<Bid>),
    AlreadyExists(Box<Bid>),
}

/// Everything produced by a successful bid acceptance. All three records were
/// committed in a single transaction.
#[derive(Debug)]
pub struct AcceptedBid {
    pub bid: Bid,
    pub lot: Lot,
    pub contract: Contract,
}

/// Outcome of a one-time-code verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpVerification {
    Verified,
    /// No live code for this email (never issued, expired, or already consumed).
    NoActiveCode,
    /// The supplied code did not match. The attempt was counted.
    WrongCode,
    /// The attempt budget is spent; the code is dead regardless of its value.
    TooManyAttempts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LotQueryFilter {
    pub organization_id: Option<i64>,
    pub status: Option<LotStatus>,
}

impl LotQueryFilter {
    pub fn with_organization(mut self, org_id: i64) -> Self {
        self.organization_id = Some(org_id);
        self
    }

    pub fn with_status(mut self, status: LotStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.organization_id.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BidQueryFilter {
    pub lot_id: Option<i64>,
    pub bidder_id: Option<String>,
    pub status: Option<BidStatus>,
}

impl BidQueryFilter {
    pub fn with_lot(mut self, lot_id: i64) -> Self {
        self.lot_id = Some(lot_id);
        self
    }

    pub fn with_bidder<S: Into<String>>(mut self, bidder_id: S) -> Self {
        self.bidder_id = Some(bidder_id.into());
        self
    }

    pub fn with_status(mut self, status: BidStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lot_id.is_none() && self.bidder_id.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractQueryFilter {
    /// Matches contracts where the organization is seller or buyer.
    pub organization_id: Option<i64>,
    pub status: Option<ContractStatus>,
}
