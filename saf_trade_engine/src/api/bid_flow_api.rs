use std::fmt::Debug;

use log::*;

use crate::{
    api::market_objects::events,
    db_types::{Bid, BidStatus, Contract, CounterOffer, NewBid, NewContract},
    events::{EventHooks, NotificationQueuedEvent},
    traits::{AcceptedBid, BidQueryFilter, InsertBidResult, MarketDbError, MarketplaceDatabase},
};

/// `BidFlowApi` drives the bid lifecycle: submission, counter-offers, and the
/// accept/reject/withdraw responses, including the contract that acceptance creates.
pub struct BidFlowApi<B> {
    db: B,
    hooks: EventHooks,
}

impl<B> Debug for BidFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BidFlowApi")
    }
}

impl<B> BidFlowApi<B> {
    pub fn new(db: B, hooks: EventHooks) -> Self {
        Self { db, hooks }
    }
}

impl<B> BidFlowApi<B>
where B: MarketplaceDatabase
{
    /// Submit a new bid against a published lot. The lot must exist and be open for
    /// bids. Re-submitting the same `(external_bid_id, lot_id)` pair returns the
    /// original bid instead of creating a second one.
    pub async fn submit_bid(&self, bid: NewBid) -> Result<InsertBidResult, MarketDbError> {
        let result = self.db.insert_bid(bid).await?;
        if let InsertBidResult::Inserted(bid) = &result {
            debug!("🤝️ Bid #{} submitted on lot #{} by {}", bid.id, bid.lot_id, bid.bidder_id);
        }
        Ok(result)
    }

    pub async fn fetch_bid(&self, id: i64) -> Result<Option<Bid>, MarketDbError> {
        self.db.fetch_bid(id).await
    }

    pub async fn fetch_bids(&self, filter: BidQueryFilter) -> Result<Vec<Bid>, MarketDbError> {
        self.db.fetch_bids(filter).await
    }

    /// Respond to a pending bid on behalf of the lot owner. `responder_org` must own
    /// the lot the bid was placed against.
    ///
    /// Acceptance is atomic: the bid is accepted, the lot reserved, and a contract
    /// derived from the bid's own terms, or none of those happen. A pending
    /// counter-offer is ignored here; only the bidder can bind its terms, through
    /// [`Self::accept_counter_offer`]. Rejection and withdrawal only touch the bid.
    /// The returned contract is `Some` only for acceptance.
    pub async fn respond_to_bid(
        &self,
        id: i64,
        responder_org: i64,
        new_status: BidStatus,
    ) -> Result<(Bid, Option<Contract>), MarketDbError> {
        let bid = self.db.fetch_bid(id).await?.ok_or(MarketDbError::BidNotFound(id))?;
        let lot = self.db.fetch_lot(bid.lot_id).await?.ok_or(MarketDbError::LotNotFound(bid.lot_id))?;
        if lot.organization_id != responder_org {
            return Err(MarketDbError::Forbidden(format!(
                "organization {responder_org} does not own lot {}",
                lot.id
            )));
        }
        match new_status {
            BidStatus::Accepted => {
                let terms = NewContract::from_bid(&bid, &lot, None);
                let AcceptedBid { bid, contract, .. } = self.db.accept_bid(id, terms).await?;
                self.call_notification_hook(events::BID_ACCEPTED).await;
                Ok((bid, Some(contract)))
            },
            BidStatus::Rejected => {
                let bid = self.db.resolve_bid(id, BidStatus::Rejected, Some(events::BID_REJECTED)).await?;
                self.call_notification_hook(events::BID_REJECTED).await;
                Ok((bid, None))
            },
            BidStatus::Withdrawn => {
                let bid = self.db.resolve_bid(id, BidStatus::Withdrawn, None).await?;
                Ok((bid, None))
            },
            other => Err(MarketDbError::InvalidBidResponse(other)),
        }
    }

    /// Withdraw a pending bid on behalf of the bidder. No ownership check; callers
    /// authenticate the bidder's system before getting here.
    pub async fn withdraw_bid(&self, id: i64) -> Result<Bid, MarketDbError> {
        self.db.resolve_bid(id, BidStatus::Withdrawn, None).await
    }

    /// Attach a counter-offer to a pending bid. The bid stays `pending` and the
    /// buyer-side system is notified.
    pub async fn propose_counter_offer(
        &self,
        id: i64,
        responder_org: i64,
        offer: CounterOffer,
    ) -> Result<Bid, MarketDbError> {
        let bid = self.db.fetch_bid(id).await?.ok_or(MarketDbError::BidNotFound(id))?;
        let lot = self.db.fetch_lot(bid.lot_id).await?.ok_or(MarketDbError::LotNotFound(bid.lot_id))?;
        if lot.organization_id != responder_org {
            return Err(MarketDbError::Forbidden(format!(
                "organization {responder_org} does not own lot {}",
                lot.id
            )));
        }
        let bid = self.db.attach_counter_offer(id, offer).await?;
        self.call_notification_hook(events::BID_COUNTER_OFFER).await;
        Ok(bid)
    }

    /// The bidder accepts the seller's counter-offer. The contract is derived from
    /// the counter-offer's terms, not the original bid; the counter-offer itself is
    /// preserved on the bid for audit.
    pub async fn accept_counter_offer(&self, id: i64) -> Result<AcceptedBid, MarketDbError> {
        let bid = self.db.fetch_bid(id).await?.ok_or(MarketDbError::BidNotFound(id))?;
        if bid.counter_offer().is_none() {
            return Err(MarketDbError::NoCounterOffer(id));
        }
        let lot = self.db.fetch_lot(bid.lot_id).await?.ok_or(MarketDbError::LotNotFound(bid.lot_id))?;
        let terms = NewContract::from_bid(&bid, &lot, bid.counter_offer());
        let accepted = self.db.accept_bid(id, terms).await?;
        self.call_notification_hook(events::BID_ACCEPTED).await;
        info!("🤝️ Counter-offer on bid #{id} accepted. Contract {} created.", accepted.contract.contract_number);
        Ok(accepted)
    }

    async fn call_notification_hook(&self, event: &str) {
        self.hooks.emit_notification_queued(NotificationQueuedEvent::new(event)).await;
    }
}
