use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Timeouts for calls to the marketplace APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl HttpSettings {
    pub fn from_env() -> Self {
        Self {
            timeout: secs_from_env("HTTP_TIMEOUT_SECS", 15),
            connect_timeout: secs_from_env("HTTP_CONNECT_TIMEOUT_SECS", 5),
        }
    }
}

fn secs_from_env(name: &str, default: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}

pub fn build_client(settings: HttpSettings) -> Client {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(settings.timeout)
        .connect_timeout(settings.connect_timeout)
        .build()
        .unwrap_or_else(|err| {
            warn!(target = "inventory.api", error = %err, "http client fallback to defaults");
            Client::new()
        })
}
