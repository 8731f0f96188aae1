use chrono::{DateTime, Utc};

use crate::{
    db_types::{Bid, Contract, ContractStatus, CounterOffer, Lot, LotUpdate, NewBid, NewContract, NewLot},
    traits::{AcceptedBid, BidQueryFilter, ContractQueryFilter, InsertBidResult, LotQueryFilter, MarketDbError},
};

/// Core storage contract for the lot / bid / contract lifecycle.
///
/// Every status transition is a conditional write: the backend must only apply the
/// change when the row is still in the expected state, and report
/// [`MarketDbError::BidAlreadyResolved`] (or the lot/contract equivalent) when it is
/// not. Multi-record flows (acceptance in particular) must be atomic.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone {
    /// The URL of the backing database.
    fn url(&self) -> &str;

    //----------------------------------------  Lots  ----------------------------------------

    async fn insert_lot(&self, lot: NewLot) -> Result<Lot, MarketDbError>;

    async fn fetch_lot(&self, id: i64) -> Result<Option<Lot>, MarketDbError>;

    async fn fetch_lots(&self, filter: LotQueryFilter) -> Result<Vec<Lot>, MarketDbError>;

    /// Applies the update and, when `update.status` moves the lot to `published`,
    /// stamps `published_at`. Status changes are validated against the lot lifecycle.
    /// Enqueues the given webhook event in the same transaction.
    async fn update_lot(&self, id: i64, update: LotUpdate, event: &str) -> Result<Lot, MarketDbError>;

    /// Deletes the lot and enqueues a `lot.deleted` event. Returns the deleted lot.
    async fn delete_lot(&self, id: i64, event: &str) -> Result<Lot, MarketDbError>;

    //----------------------------------------  Bids  ----------------------------------------

    /// Inserts a new pending bid. When the bid carries an `external_bid_id` that was
    /// already used against the same lot, nothing is written and the original bid is
    /// returned as [`InsertBidResult::AlreadyExists`].
    async fn insert_bid(&self, bid: NewBid) -> Result<InsertBidResult, MarketDbError>;

    async fn fetch_bid(&self, id: i64) -> Result<Option<Bid>, MarketDbError>;

    async fn fetch_bids(&self, filter: BidQueryFilter) -> Result<Vec<Bid>, MarketDbError>;

    /// Marks a pending bid rejected or withdrawn, stamps `responded_at`, and (for
    /// rejections) enqueues the webhook event — one transaction, conditional on the
    /// bid still being `pending`.
    async fn resolve_bid(
        &self,
        id: i64,
        status: crate::db_types::BidStatus,
        event: Option<&str>,
    ) -> Result<Bid, MarketDbError>;

    /// Accepts a pending bid: bid → `accepted`, lot → `reserved`, the contract in
    /// `terms` is created (retrying the generated contract number on collision), and
    /// a `bid.accepted` event is enqueued. All-or-nothing: a failure in any step
    /// (including contract creation) rolls the acceptance back.
    async fn accept_bid(&self, id: i64, terms: NewContract) -> Result<AcceptedBid, MarketDbError>;

    /// Attaches a counter-offer to a pending bid (status stays `pending`) and
    /// enqueues a `bid.counter_offer` event. Conditional on the bid being `pending`.
    async fn attach_counter_offer(&self, id: i64, offer: CounterOffer) -> Result<Bid, MarketDbError>;

    //--------------------------------------  Contracts  --------------------------------------

    /// Creates a contract outside the acceptance flow (explicit `POST /contracts`).
    async fn insert_contract(&self, contract: NewContract) -> Result<Contract, MarketDbError>;

    async fn fetch_contract(&self, id: i64) -> Result<Option<Contract>, MarketDbError>;

    async fn fetch_contracts(&self, filter: ContractQueryFilter) -> Result<Vec<Contract>, MarketDbError>;

    /// Advances a contract through its signature lifecycle. Conditional on the stored
    /// status still permitting the transition; stamps `signed_at`/`completed_at` and
    /// records the signer where appropriate.
    async fn update_contract_status(
        &self,
        id: i64,
        new_status: ContractStatus,
        signer: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Contract, MarketDbError>;
}
