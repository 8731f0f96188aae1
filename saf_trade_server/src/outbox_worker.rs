//! Drains the webhook outbox.
//!
//! The engine enqueues a notification row in the same transaction as the state
//! change it describes; this worker is the only thing that delivers them. It wakes
//! on a timer and whenever a flow nudges it, claims the due rows in order, and
//! POSTs each to the dashboard. A failed delivery is rescheduled with exponential
//! backoff until the attempt budget is spent, after which the row is abandoned and
//! flagged for operators.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use dashboard_tools::DashboardApi;
use log::*;
use saf_trade_engine::{traits::OutboxManagement, SqliteDatabase};
use tokio::{sync::Notify, task::JoinHandle};

/// Rows claimed per drain pass.
const BATCH_SIZE: i64 = 50;
/// First retry delay. Doubles on every subsequent failure.
const BASE_RETRY_SECS: i64 = 30;
/// Delivery attempts before a row is declared dead.
const MAX_ATTEMPTS: i64 = 10;

/// Starts the outbox drain worker. Do not await the returned JoinHandle, as it will
/// run indefinitely. Signalling `nudge` wakes the worker early; drains are
/// serialized in this task so a nudge during a pass never double-delivers.
pub fn start_outbox_worker(
    db: SqliteDatabase,
    api: DashboardApi,
    interval: Duration,
    nudge: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        if api.is_configured() {
            info!("📬️ Outbox drain worker started (every {}s)", interval.as_secs());
        } else {
            warn!(
                "📬️ No webhook URL is configured. Notifications will queue up in the outbox until one is \
                 provided."
            );
        }
        loop {
            tokio::select! {
                _ = timer.tick() => {},
                _ = nudge.notified() => {
                    trace!("📬️ Outbox worker nudged");
                },
            }
            if !api.is_configured() {
                continue;
            }
            if let Err(e) = drain_once(&db, &api).await {
                error!("📬️ Error draining the outbox: {e}");
            }
        }
    })
}

/// A single drain pass. Every due row gets exactly one delivery attempt; the pass
/// itself only fails on database errors.
pub async fn drain_once(
    db: &SqliteDatabase,
    api: &DashboardApi,
) -> Result<(), saf_trade_engine::traits::MarketDbError> {
    let due = db.fetch_due_notifications(BATCH_SIZE, Utc::now()).await?;
    if due.is_empty() {
        return Ok(());
    }
    debug!("📬️ Draining {} outbox row(s)", due.len());
    for row in due {
        match api.post_notification(&row.event, &row.payload).await {
            Ok(()) => {
                debug!("📬️ Delivered {} notification #{}", row.event, row.id);
                db.mark_delivered(row.id, Utc::now()).await?;
            },
            Err(e) => {
                let attempts = row.attempts + 1;
                let dead = attempts >= MAX_ATTEMPTS;
                let delay = BASE_RETRY_SECS.saturating_mul(1i64 << attempts.min(20));
                let next_attempt_at = Utc::now() + chrono::Duration::seconds(delay);
                if dead {
                    error!(
                        "📬️ Giving up on {} notification #{} after {attempts} attempts: {e}. The row is dead \
                         and must be reconciled by hand.",
                        row.event, row.id
                    );
                } else {
                    warn!(
                        "📬️ Delivery of {} notification #{} failed (attempt {attempts}): {e}. Retrying after \
                         {delay}s.",
                        row.event, row.id
                    );
                }
                db.mark_failed(row.id, next_attempt_at, dead).await?;
            },
        }
    }
    Ok(())
}
