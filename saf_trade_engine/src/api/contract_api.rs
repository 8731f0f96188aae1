use std::fmt::Debug;

use chrono::{NaiveDate, Utc};
use log::*;

use crate::{
    db_types::{Contract, ContractStatus, NewContract},
    traits::{ContractQueryFilter, MarketDbError, MarketplaceDatabase},
};

/// Fields a seller may override when creating a contract from a bid. Anything left
/// `None` is taken from the bid and lot.
#[derive(Debug, Clone, Default)]
pub struct ContractOverrides {
    pub title: Option<String>,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<String>,
}

/// Contract creation and the signature lifecycle.
pub struct ContractApi<B> {
    db: B,
}

impl<B> Debug for ContractApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContractApi")
    }
}

impl<B> ContractApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ContractApi<B>
where B: MarketplaceDatabase
{
    /// Create a draft contract from an existing bid, outside the acceptance flow.
    /// `owner_org` must own the lot the bid was placed against. The contract carries
    /// the bid's own terms; a pending counter-offer is never binding until the
    /// bidder accepts it.
    pub async fn create_from_bid(
        &self,
        owner_org: i64,
        bid_id: i64,
        overrides: ContractOverrides,
    ) -> Result<Contract, MarketDbError> {
        let bid = self.db.fetch_bid(bid_id).await?.ok_or(MarketDbError::BidNotFound(bid_id))?;
        let lot = self.db.fetch_lot(bid.lot_id).await?.ok_or(MarketDbError::LotNotFound(bid.lot_id))?;
        if lot.organization_id != owner_org {
            return Err(MarketDbError::Forbidden(format!(
                "organization {owner_org} does not own lot {}",
                lot.id
            )));
        }
        let mut terms = NewContract::from_bid(&bid, &lot, None);
        if overrides.title.is_some() {
            terms.title = overrides.title;
        }
        if overrides.description.is_some() {
            terms.description = overrides.description;
        }
        if overrides.terms.is_some() {
            terms.terms = overrides.terms;
        }
        if overrides.delivery_date.is_some() {
            terms.delivery_date = overrides.delivery_date;
        }
        if overrides.delivery_location.is_some() {
            terms.delivery_location = overrides.delivery_location;
        }
        let contract = self.db.insert_contract(terms).await?;
        debug!("📑️ Contract {} drafted from bid #{bid_id}", contract.contract_number);
        Ok(contract)
    }

    pub async fn fetch_contract(&self, id: i64) -> Result<Option<Contract>, MarketDbError> {
        self.db.fetch_contract(id).await
    }

    pub async fn fetch_contracts(&self, filter: ContractQueryFilter) -> Result<Vec<Contract>, MarketDbError> {
        self.db.fetch_contracts(filter).await
    }

    /// Advance a contract through its lifecycle. `owner_org` must be the contract's
    /// seller; invalid transitions are rejected before touching the row.
    pub async fn update_status(
        &self,
        id: i64,
        owner_org: i64,
        new_status: ContractStatus,
        signer: Option<&str>,
    ) -> Result<Contract, MarketDbError> {
        let current = self.db.fetch_contract(id).await?.ok_or(MarketDbError::ContractNotFound(id))?;
        if current.seller_org_id != owner_org {
            return Err(MarketDbError::Forbidden(format!(
                "organization {owner_org} is not the seller on contract {id}"
            )));
        }
        self.db.update_contract_status(id, new_status, signer, Utc::now()).await
    }
}
