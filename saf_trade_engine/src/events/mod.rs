mod event_types;
mod hooks;

pub use event_types::NotificationQueuedEvent;
pub use hooks::{EventHooks, Handler};
