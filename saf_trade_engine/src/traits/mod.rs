//! Traits that a storage backend must implement to drive the marketplace engine.
//!
//! The APIs in [`crate::api`] are generic over these traits; the SQLite backend in
//! [`crate::db`] is the only shipped implementation.

mod data_objects;
mod errors;
mod marketplace_database;
mod membership_management;
mod otp_management;
mod outbox_management;

pub use data_objects::{AcceptedBid, BidQueryFilter, ContractQueryFilter, InsertBidResult, LotQueryFilter, OtpVerification};
pub use errors::MarketDbError;
pub use marketplace_database::MarketplaceDatabase;
pub use membership_management::MembershipManagement;
pub use otp_management::OtpManagement;
pub use outbox_management::OutboxManagement;
