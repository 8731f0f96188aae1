use std::{env, time::Duration};

use dashboard_tools::DashboardConfig;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use stp_common::Secret;

const DEFAULT_STS_HOST: &str = "127.0.0.1";
const DEFAULT_STS_PORT: u16 = 8360;
const DEFAULT_OUTBOX_INTERVAL: Duration = Duration::from_secs(30);
/// Session tokens are good for 24 hours.
pub const SESSION_TTL: chrono::Duration = chrono::Duration::hours(24);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// Shared secret for the external (machine-to-machine) endpoints. `None` leaves
    /// them open, which is only sane in local development.
    pub api_key: Option<Secret<String>>,
    /// How often the outbox drain worker wakes up to retry failed deliveries.
    pub outbox_interval: Duration,
    pub dashboard_config: DashboardConfig,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HMAC key for signing session tokens.
    pub session_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { session_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, env::VarError> {
        let session_secret = env::var("STS_SESSION_SECRET")?;
        Ok(Self { session_secret: Secret::new(session_secret) })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_STS_HOST.to_string(),
            port: DEFAULT_STS_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            api_key: None,
            outbox_interval: DEFAULT_OUTBOX_INTERVAL,
            dashboard_config: DashboardConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("STS_HOST").ok().unwrap_or_else(|| DEFAULT_STS_HOST.into());
        let port = env::var("STS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for STS_PORT. {e} Using the default, {DEFAULT_STS_PORT}, instead."
                    );
                    DEFAULT_STS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_STS_PORT);
        let database_url = env::var("STS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ STS_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ STS_SESSION_SECRET is not set ({e}). Generating a random session secret. Existing sessions will \
                 not survive a restart."
            );
            AuthConfig::default()
        });
        let api_key = match env::var("STS_API_KEY") {
            Ok(key) if !key.is_empty() => Some(Secret::new(key)),
            _ => {
                warn!(
                    "🚨️ STS_API_KEY is not set. The external endpoints are OPEN. Do not run a production server like \
                     this."
                );
                None
            },
        };
        let outbox_interval = env::var("STS_OUTBOX_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_OUTBOX_INTERVAL);
        let dashboard_config = DashboardConfig::new_from_env_or_default();
        Self { host, port, database_url, auth, api_key, outbox_interval, dashboard_config }
    }
}
