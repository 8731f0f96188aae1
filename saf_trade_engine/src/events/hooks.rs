use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::NotificationQueuedEvent;

pub type Handler<E> = Arc<dyn (Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync>;

/// Callbacks the APIs invoke after a transaction commits that queued outbox work.
///
/// Hooks are best-effort latency hints. The outbox row is the durable record, so a
/// missing or slow hook never loses a notification; it only delays delivery until
/// the next timer tick.
#[derive(Default, Clone)]
pub struct EventHooks {
    on_notification_queued: Option<Handler<NotificationQueuedEvent>>,
}

impl EventHooks {
    pub fn on_notification_queued<F>(mut self, f: F) -> Self
    where F: (Fn(NotificationQueuedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_notification_queued = Some(Arc::new(f));
        self
    }

    pub async fn emit_notification_queued(&self, event: NotificationQueuedEvent) {
        if let Some(hook) = &self.on_notification_queued {
            trace!("📬️ Nudging outbox drain for {}", event.event);
            hook(event).await;
        }
    }
}
