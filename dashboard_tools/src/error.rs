use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("No webhook URL is configured")]
    NotConfigured,
    #[error("Could not reach the dashboard: {0}")]
    RequestError(String),
    #[error("Webhook delivery failed. Error {status}. {message}")]
    DeliveryFailed { status: u16, message: String },
}
