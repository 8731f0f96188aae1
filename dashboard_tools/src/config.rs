use std::time::Duration;

use log::*;
use stp_common::Secret;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default)]
pub struct DashboardConfig {
    /// Where notifications get POSTed. `None` disables delivery entirely.
    pub webhook_url: Option<String>,
    /// Sent as `Authorization: Bearer <secret>` when set.
    pub webhook_secret: Secret<String>,
    pub timeout: Duration,
}

impl DashboardConfig {
    pub fn new_from_env_or_default() -> Self {
        let webhook_url = std::env::var("STS_WEBHOOK_URL").ok();
        if webhook_url.is_none() {
            warn!("STS_WEBHOOK_URL not set. Webhook notifications will not be delivered anywhere.");
        }
        let webhook_secret = Secret::new(std::env::var("STS_WEBHOOK_SECRET").unwrap_or_default());
        let timeout = std::env::var("STS_WEBHOOK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self { webhook_url, webhook_secret, timeout }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}
