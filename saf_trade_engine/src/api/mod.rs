//! The high-level marketplace APIs.
//!
//! Handlers talk to these rather than to the storage traits directly: the APIs add
//! ownership checks, contract derivation, and the post-commit event hook calls that
//! nudge the webhook drain worker.

pub mod market_objects;

mod bid_flow_api;
mod contract_api;
mod lot_api;
mod membership_api;
mod otp_api;

pub use bid_flow_api::BidFlowApi;
pub use contract_api::{ContractApi, ContractOverrides};
pub use lot_api::LotApi;
pub use membership_api::MembershipApi;
pub use otp_api::{OtpApi, OTP_MAX_ATTEMPTS, OTP_TTL};
