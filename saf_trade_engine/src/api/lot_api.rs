use std::fmt::Debug;

use crate::{
    api::market_objects::events,
    db_types::{Lot, LotStatus, LotUpdate, NewLot},
    events::{EventHooks, NotificationQueuedEvent},
    traits::{LotQueryFilter, MarketDbError, MarketplaceDatabase},
};

/// Lot CRUD on behalf of the owning organization, with the webhook notifications
/// each change produces.
pub struct LotApi<B> {
    db: B,
    hooks: EventHooks,
}

impl<B> Debug for LotApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LotApi")
    }
}

impl<B> LotApi<B> {
    pub fn new(db: B, hooks: EventHooks) -> Self {
        Self { db, hooks }
    }
}

impl<B> LotApi<B>
where B: MarketplaceDatabase
{
    pub async fn create_lot(&self, lot: NewLot) -> Result<Lot, MarketDbError> {
        let lot = self.db.insert_lot(lot).await?;
        self.call_notification_hook(events::LOT_CREATED).await;
        Ok(lot)
    }

    pub async fn fetch_lot(&self, id: i64) -> Result<Option<Lot>, MarketDbError> {
        self.db.fetch_lot(id).await
    }

    pub async fn fetch_lots(&self, filter: LotQueryFilter) -> Result<Vec<Lot>, MarketDbError> {
        self.db.fetch_lots(filter).await
    }

    /// Apply an update on behalf of `owner_org`. Moving the lot to `published`
    /// announces `lot.published` rather than the generic `lot.updated`.
    pub async fn update_lot(&self, id: i64, owner_org: i64, update: LotUpdate) -> Result<Lot, MarketDbError> {
        let current = self.db.fetch_lot(id).await?.ok_or(MarketDbError::LotNotFound(id))?;
        if current.organization_id != owner_org {
            return Err(MarketDbError::Forbidden(format!("organization {owner_org} does not own lot {id}")));
        }
        let publishing = update.status == Some(LotStatus::Published) && current.status != LotStatus::Published;
        let event = if publishing { events::LOT_PUBLISHED } else { events::LOT_UPDATED };
        let lot = self.db.update_lot(id, update, event).await?;
        self.call_notification_hook(event).await;
        Ok(lot)
    }

    pub async fn delete_lot(&self, id: i64, owner_org: i64) -> Result<Lot, MarketDbError> {
        let current = self.db.fetch_lot(id).await?.ok_or(MarketDbError::LotNotFound(id))?;
        if current.organization_id != owner_org {
            return Err(MarketDbError::Forbidden(format!("organization {owner_org} does not own lot {id}")));
        }
        let lot = self.db.delete_lot(id, events::LOT_DELETED).await?;
        self.call_notification_hook(events::LOT_DELETED).await;
        Ok(lot)
    }

    async fn call_notification_hook(&self, event: &str) {
        self.hooks.emit_notification_queued(NotificationQueuedEvent::new(event)).await;
    }
}
