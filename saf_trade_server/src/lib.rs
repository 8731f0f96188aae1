//! # SAF trade server
//! This module hosts the HTTP server for the marketplace. It is responsible for:
//! Authenticating users via one-time email codes and session tokens.
//! Exposing the lot, bid, contract, organization, and certificate endpoints.
//! Authenticating the remote buyer-side system via a shared API key.
//! Draining the webhook outbox to the dashboard.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod outbox_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
