use thiserror::Error;

use crate::db_types::{BidStatus, ContractStatus, LotStatus};

#[derive(Debug, Error)]
pub enum MarketDbError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Lot {0} does not exist")]
    LotNotFound(i64),
    #[error("Bid {0} does not exist")]
    BidNotFound(i64),
    #[error("Contract {0} does not exist")]
    ContractNotFound(i64),
    #[error("Organization {0} does not exist")]
    OrganizationNotFound(i64),
    #[error("Lot {id} is not open for bids (status is {status})")]
    LotNotOpen { id: i64, status: LotStatus },
    #[error("Lot {id} cannot move from {from} to {to}")]
    InvalidLotTransition { id: i64, from: LotStatus, to: LotStatus },
    #[error("Bid {id} has already been resolved (status is {status})")]
    BidAlreadyResolved { id: i64, status: BidStatus },
    #[error("{0} is not a valid response to a bid")]
    InvalidBidResponse(BidStatus),
    #[error("Contract {id} cannot move from {from} to {to}")]
    InvalidContractTransition { id: i64, from: ContractStatus, to: ContractStatus },
    #[error("Could not find an unused contract number after {0} attempts")]
    ContractNumberExhausted(usize),
    #[error("Bid {0} has no counter-offer to accept")]
    NoCounterOffer(i64),
    #[error("Not permitted: {0}")]
    Forbidden(String),
    #[error("A membership for user {user_id} in organization {organization_id} already exists")]
    DuplicateMembership { organization_id: i64, user_id: String },
    #[error("Invalid pricing: {0}")]
    Pricing(#[from] stp_common::PricingError),
    #[error("Could not serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}
