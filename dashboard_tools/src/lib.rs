//! A thin client for the remote trading dashboard.
//!
//! The dashboard receives marketplace notifications as webhook POSTs. This crate
//! owns the HTTP plumbing: the endpoint configuration, the bearer secret, and the
//! request timeout. What gets sent, and when, is the caller's business.
mod api;
mod config;
mod error;

pub use api::DashboardApi;
pub use config::DashboardConfig;
pub use error::DashboardApiError;
