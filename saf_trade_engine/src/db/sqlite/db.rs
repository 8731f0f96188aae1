use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use crate::{
    api::market_objects::events,
    db::sqlite::{bids, certificates, contracts, db_url, lots, memberships, new_pool, otp, outbox},
    db_types::{
        Bid,
        BidStatus,
        Certificate,
        Contract,
        ContractStatus,
        CounterOffer,
        Lot,
        LotStatus,
        LotUpdate,
        Membership,
        NewBid,
        NewCertificate,
        NewContract,
        NewLot,
        NewOrganization,
        Organization,
        OutboxRow,
        Role,
    },
    traits::{
        AcceptedBid,
        BidQueryFilter,
        ContractQueryFilter,
        InsertBidResult,
        LotQueryFilter,
        MarketDbError,
        MarketplaceDatabase,
        MembershipManagement,
        OtpManagement,
        OtpVerification,
        OutboxManagement,
    },
};

/// SQLite storage backend for the marketplace.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool using the url from the `STS_DATABASE_URL`
    /// environment variable, or the default.
    pub async fn new(max_connections: u32) -> Result<Self, MarketDbError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, MarketDbError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_lot(&self, lot: NewLot) -> Result<Lot, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        let lot = lots::insert_lot(lot, &mut tx).await?;
        let payload = outbox::lot_payload(events::LOT_CREATED, &lot);
        outbox::enqueue(events::LOT_CREATED, &payload, &mut tx).await?;
        tx.commit().await?;
        debug!("📦️ Created lot #{} ({})", lot.id, lot.title);
        Ok(lot)
    }

    async fn fetch_lot(&self, id: i64) -> Result<Option<Lot>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        lots::fetch_lot(id, &mut conn).await
    }

    async fn fetch_lots(&self, filter: LotQueryFilter) -> Result<Vec<Lot>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        lots::fetch_lots(filter, &mut conn).await
    }

    async fn update_lot(&self, id: i64, update: LotUpdate, event: &str) -> Result<Lot, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        let current = lots::fetch_lot(id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(id))?;
        let mut stamp_published = false;
        if let Some(next) = update.status {
            if next != current.status {
                if !current.status.can_transition_to(next) {
                    return Err(MarketDbError::InvalidLotTransition { id, from: current.status, to: next });
                }
                stamp_published = next == LotStatus::Published;
            }
        }
        let applied = lots::apply_update(id, &update, current.status, stamp_published, &mut tx).await?;
        if !applied {
            // Lost a race with another writer. Re-read for an accurate error.
            let lot = lots::fetch_lot(id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(id))?;
            return Err(MarketDbError::InvalidLotTransition {
                id,
                from: lot.status,
                to: update.status.unwrap_or(lot.status),
            });
        }
        let updated = lots::fetch_lot(id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(id))?;
        let payload = outbox::lot_payload(event, &updated);
        outbox::enqueue(event, &payload, &mut tx).await?;
        tx.commit().await?;
        debug!("📦️ Updated lot #{id}, queued {event}");
        Ok(updated)
    }

    async fn delete_lot(&self, id: i64, event: &str) -> Result<Lot, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        let lot = lots::fetch_lot(id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(id))?;
        if !lots::delete_lot(id, &mut tx).await? {
            return Err(MarketDbError::LotNotFound(id));
        }
        let payload = outbox::lot_payload(event, &lot);
        outbox::enqueue(event, &payload, &mut tx).await?;
        tx.commit().await?;
        debug!("📦️ Deleted lot #{id}");
        Ok(lot)
    }

    async fn insert_bid(&self, bid: NewBid) -> Result<InsertBidResult, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        let lot = lots::fetch_lot(bid.lot_id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(bid.lot_id))?;
        if lot.status != LotStatus::Published {
            return Err(MarketDbError::LotNotOpen { id: lot.id, status: lot.status });
        }
        let result = bids::idempotent_insert(bid, &mut tx).await?;
        tx.commit().await?;
        if let InsertBidResult::Inserted(bid) = &result {
            debug!("🤝️ New bid #{} on lot #{}", bid.id, bid.lot_id);
        }
        Ok(result)
    }

    async fn fetch_bid(&self, id: i64) -> Result<Option<Bid>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        bids::fetch_bid(id, &mut conn).await
    }

    async fn fetch_bids(&self, filter: BidQueryFilter) -> Result<Vec<Bid>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        bids::fetch_bids(filter, &mut conn).await
    }

    async fn resolve_bid(&self, id: i64, status: BidStatus, event: Option<&str>) -> Result<Bid, MarketDbError> {
        if !status.is_response() {
            return Err(MarketDbError::BidAlreadyResolved { id, status });
        }
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        if !bids::try_resolve(id, status, now, &mut tx).await? {
            let bid = bids::fetch_bid(id, &mut tx).await?.ok_or(MarketDbError::BidNotFound(id))?;
            return Err(MarketDbError::BidAlreadyResolved { id, status: bid.status });
        }
        let bid = bids::fetch_bid(id, &mut tx).await?.ok_or(MarketDbError::BidNotFound(id))?;
        if let Some(event) = event {
            let lot = lots::fetch_lot(bid.lot_id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(bid.lot_id))?;
            let payload = outbox::bid_payload(event, &bid, &lot, None);
            outbox::enqueue(event, &payload, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🤝️ Bid #{id} is now {status}");
        Ok(bid)
    }

    async fn accept_bid(&self, id: i64, terms: NewContract) -> Result<AcceptedBid, MarketDbError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        if !bids::try_resolve(id, BidStatus::Accepted, now, &mut tx).await? {
            let bid = bids::fetch_bid(id, &mut tx).await?.ok_or(MarketDbError::BidNotFound(id))?;
            return Err(MarketDbError::BidAlreadyResolved { id, status: bid.status });
        }
        let bid = bids::fetch_bid(id, &mut tx).await?.ok_or(MarketDbError::BidNotFound(id))?;
        if !lots::try_transition(bid.lot_id, LotStatus::Published, LotStatus::Reserved, now, &mut tx).await? {
            let lot = lots::fetch_lot(bid.lot_id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(bid.lot_id))?;
            return Err(MarketDbError::LotNotOpen { id: lot.id, status: lot.status });
        }
        let contract = contracts::insert_with_unique_number(terms, &mut tx).await?;
        let lot = lots::fetch_lot(bid.lot_id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(bid.lot_id))?;
        let payload = outbox::bid_payload(events::BID_ACCEPTED, &bid, &lot, Some(&contract));
        outbox::enqueue(events::BID_ACCEPTED, &payload, &mut tx).await?;
        tx.commit().await?;
        info!("🤝️ Accepted bid #{id} on lot #{}. Contract {} created.", lot.id, contract.contract_number);
        Ok(AcceptedBid { bid, lot, contract })
    }

    async fn attach_counter_offer(&self, id: i64, offer: CounterOffer) -> Result<Bid, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        if !bids::try_attach_counter_offer(id, &offer, &mut tx).await? {
            let bid = bids::fetch_bid(id, &mut tx).await?.ok_or(MarketDbError::BidNotFound(id))?;
            return Err(MarketDbError::BidAlreadyResolved { id, status: bid.status });
        }
        let bid = bids::fetch_bid(id, &mut tx).await?.ok_or(MarketDbError::BidNotFound(id))?;
        let lot = lots::fetch_lot(bid.lot_id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(bid.lot_id))?;
        let payload = outbox::bid_payload(events::BID_COUNTER_OFFER, &bid, &lot, None);
        outbox::enqueue(events::BID_COUNTER_OFFER, &payload, &mut tx).await?;
        tx.commit().await?;
        debug!("🤝️ Counter-offer recorded on bid #{id}");
        Ok(bid)
    }

    async fn insert_contract(&self, contract: NewContract) -> Result<Contract, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        let contract = contracts::insert_with_unique_number(contract, &mut tx).await?;
        tx.commit().await?;
        debug!("📑️ Created contract {} for bid #{}", contract.contract_number, contract.bid_id);
        Ok(contract)
    }

    async fn fetch_contract(&self, id: i64) -> Result<Option<Contract>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        contracts::fetch_contract(id, &mut conn).await
    }

    async fn fetch_contracts(&self, filter: ContractQueryFilter) -> Result<Vec<Contract>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        contracts::fetch_contracts(filter, &mut conn).await
    }

    async fn update_contract_status(
        &self,
        id: i64,
        new_status: ContractStatus,
        signer: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Contract, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        let current = contracts::fetch_contract(id, &mut tx).await?.ok_or(MarketDbError::ContractNotFound(id))?;
        if !current.status.can_transition_to(new_status) {
            return Err(MarketDbError::InvalidContractTransition { id, from: current.status, to: new_status });
        }
        if !contracts::try_transition(id, current.status, new_status, signer, now, &mut tx).await? {
            let contract = contracts::fetch_contract(id, &mut tx).await?.ok_or(MarketDbError::ContractNotFound(id))?;
            return Err(MarketDbError::InvalidContractTransition { id, from: contract.status, to: new_status });
        }
        let contract = contracts::fetch_contract(id, &mut tx).await?.ok_or(MarketDbError::ContractNotFound(id))?;
        tx.commit().await?;
        debug!("📑️ Contract {} is now {new_status}", contract.contract_number);
        Ok(contract)
    }
}

impl MembershipManagement for SqliteDatabase {
    async fn insert_organization(&self, org: NewOrganization) -> Result<Organization, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        memberships::insert_organization(org, &mut conn).await
    }

    async fn fetch_organization(&self, id: i64) -> Result<Option<Organization>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        memberships::fetch_organization(id, &mut conn).await
    }

    async fn insert_membership(
        &self,
        organization_id: i64,
        user_id: &str,
        role: Role,
    ) -> Result<Membership, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        memberships::fetch_organization(organization_id, &mut tx)
            .await?
            .ok_or(MarketDbError::OrganizationNotFound(organization_id))?;
        let membership = memberships::insert_membership(organization_id, user_id, role, &mut tx).await?;
        tx.commit().await?;
        debug!("🧑️ Added {user_id} to org #{organization_id} as {role}");
        Ok(membership)
    }

    async fn remove_membership(&self, organization_id: i64, user_id: &str) -> Result<bool, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        memberships::remove_membership(organization_id, user_id, &mut conn).await
    }

    async fn membership_for_user(&self, user_id: &str) -> Result<Option<Membership>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        memberships::membership_for_user(user_id, &mut conn).await
    }

    async fn memberships_for_organization(&self, organization_id: i64) -> Result<Vec<Membership>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        memberships::memberships_for_organization(organization_id, &mut conn).await
    }

    async fn insert_certificate(&self, cert: NewCertificate) -> Result<Certificate, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        memberships::fetch_organization(cert.organization_id, &mut tx)
            .await?
            .ok_or(MarketDbError::OrganizationNotFound(cert.organization_id))?;
        if let Some(lot_id) = cert.lot_id {
            lots::fetch_lot(lot_id, &mut tx).await?.ok_or(MarketDbError::LotNotFound(lot_id))?;
        }
        let cert = certificates::insert_certificate(cert, &mut tx).await?;
        tx.commit().await?;
        debug!("📜️ Stored certificate #{} ({}) for org #{}", cert.id, cert.standard, cert.organization_id);
        Ok(cert)
    }

    async fn fetch_certificates(
        &self,
        organization_id: Option<i64>,
        lot_id: Option<i64>,
    ) -> Result<Vec<Certificate>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        certificates::fetch_certificates(organization_id, lot_id, &mut conn).await
    }
}

impl OtpManagement for SqliteDatabase {
    async fn upsert_otp(&self, email: &str, code: &str, expires_at: DateTime<Utc>) -> Result<(), MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        otp::upsert_code(email, code, expires_at, &mut conn).await
    }

    async fn verify_otp(&self, email: &str, code: &str, max_attempts: i64) -> Result<OtpVerification, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        otp::verify_code(email, code, max_attempts, &mut conn).await
    }
}

impl OutboxManagement for SqliteDatabase {
    async fn fetch_due_notifications(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<OutboxRow>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        outbox::fetch_due(limit, now, &mut conn).await
    }

    async fn mark_delivered(&self, id: i64, now: DateTime<Utc>) -> Result<(), MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        outbox::mark_delivered(id, now, &mut conn).await
    }

    async fn mark_failed(&self, id: i64, next_attempt_at: DateTime<Utc>, dead: bool) -> Result<(), MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        outbox::mark_failed(id, next_attempt_at, dead, &mut conn).await
    }
}
