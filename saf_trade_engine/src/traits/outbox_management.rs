use chrono::{DateTime, Utc};

use crate::{db_types::OutboxRow, traits::MarketDbError};

/// The webhook outbox: durably queued notifications for the remote dashboard.
///
/// Rows are enqueued by the flow methods of [`crate::traits::MarketplaceDatabase`]
/// inside the transaction of the state change they describe; a drain worker claims
/// due rows and either marks them delivered or schedules a retry.
#[allow(async_fn_in_trait)]
pub trait OutboxManagement {
    /// Fetches undelivered, non-dead rows whose `next_attempt_at` has passed,
    /// oldest first.
    async fn fetch_due_notifications(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<OutboxRow>, MarketDbError>;

    async fn mark_delivered(&self, id: i64, now: DateTime<Utc>) -> Result<(), MarketDbError>;

    /// Records a failed delivery attempt. When `dead` is set the row is abandoned
    /// and will never be retried; operators reconcile dead rows by hand.
    async fn mark_failed(
        &self,
        id: i64,
        next_attempt_at: DateTime<Utc>,
        dead: bool,
    ) -> Result<(), MarketDbError>;
}
