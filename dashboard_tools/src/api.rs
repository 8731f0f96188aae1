use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::Value;

use crate::{config::DashboardConfig, error::DashboardApiError};

#[derive(Clone)]
pub struct DashboardApi {
    config: DashboardConfig,
    client: Arc<Client>,
}

impl DashboardApi {
    pub fn new(config: DashboardConfig) -> Result<Self, DashboardApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        if config.webhook_secret.is_set() {
            let bearer = format!("Bearer {}", config.webhook_secret.reveal());
            let mut val =
                HeaderValue::from_str(&bearer).map_err(|e| DashboardApiError::Initialization(e.to_string()))?;
            val.set_sensitive(true);
            headers.insert("Authorization", val);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| DashboardApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// POST one notification payload to the dashboard. A non-2xx response is an
    /// error so the caller can schedule a retry.
    pub async fn post_notification(&self, event: &str, payload: &Value) -> Result<(), DashboardApiError> {
        let url = self.config.webhook_url.as_deref().ok_or(DashboardApiError::NotConfigured)?;
        trace!("📡️ Posting {event} notification to {url}");
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DashboardApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            debug!("📡️ {event} notification delivered ({})", response.status());
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|e| e.to_string());
            Err(DashboardApiError::DeliveryFailed { status, message })
        }
    }
}
