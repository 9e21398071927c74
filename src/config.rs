use crate::inventory::marketplace::ShopifyStore;
use once_cell::sync::Lazy;
use std::{env, time::Duration};
use thiserror::Error;

pub static FLIPKART_API_ROOT: Lazy<String> = Lazy::new(|| {
    env::var("FLIPKART_API_ROOT")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .unwrap_or_else(|| "https://api.flipkart.net".to_string())
});

pub const FLIPKART_DEFAULT_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {} env vars for {marketplace}", .vars.join(" / "))]
    Missing {
        marketplace: &'static str,
        vars: Vec<&'static str>,
    },
}

/// Everything the submitters read from the process environment. Each
/// credential stays optional here; a submitter refuses to start when its
/// own are missing.
#[derive(Debug, Clone)]
pub struct Settings {
    pub flipkart: FlipkartSettings,
    pub ptfs: ShopifySettings,
    pub vitashop: ShopifySettings,
    pub naturtint: ShopifySettings,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            flipkart: FlipkartSettings::from_env(),
            ptfs: ShopifySettings::from_env(ShopifyStore::Ptfs),
            vitashop: ShopifySettings::from_env(ShopifyStore::Vitashop),
            naturtint: ShopifySettings::from_env(ShopifyStore::Naturtint),
        }
    }

    pub fn shopify(&self, store: ShopifyStore) -> &ShopifySettings {
        match store {
            ShopifyStore::Ptfs => &self.ptfs,
            ShopifyStore::Vitashop => &self.vitashop,
            ShopifyStore::Naturtint => &self.naturtint,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlipkartSettings {
    pub token: Option<String>,
    pub location_id: Option<String>,
    pub api_root: String,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipkartCredentials {
    pub token: String,
    pub location_id: String,
    pub api_root: String,
}

impl FlipkartSettings {
    pub fn from_env() -> Self {
        Self {
            token: env_value("FLIPKART_TOKEN"),
            location_id: env_value("FLIPKART_LOCATION_ID"),
            api_root: FLIPKART_API_ROOT.clone(),
            delay: delay_from_env("FLIPKART_REQUEST_DELAY_MS", FLIPKART_DEFAULT_DELAY),
        }
    }

    pub fn credentials(&self) -> Result<FlipkartCredentials, ConfigError> {
        match (&self.token, &self.location_id) {
            (Some(token), Some(location_id)) => Ok(FlipkartCredentials {
                token: token.clone(),
                location_id: location_id.clone(),
                api_root: self.api_root.clone(),
            }),
            (token, location_id) => Err(ConfigError::Missing {
                marketplace: "flipkart",
                vars: [
                    ("FLIPKART_TOKEN", token.is_none()),
                    ("FLIPKART_LOCATION_ID", location_id.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShopifySettings {
    pub store: ShopifyStore,
    pub shop: Option<String>,
    pub token: Option<String>,
    pub location_id: Option<String>,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopifyCredentials {
    pub shop: String,
    pub token: String,
    pub location_id: String,
}

impl ShopifyCredentials {
    /// Admin API root for the shop. A bare `*.myshopify.com` domain gets
    /// `https://`; a full URL is used as given.
    pub fn base_url(&self) -> String {
        let shop = self.shop.trim().trim_end_matches('/');
        if shop.starts_with("http://") || shop.starts_with("https://") {
            shop.to_string()
        } else {
            format!("https://{shop}")
        }
    }
}

impl ShopifySettings {
    pub fn from_env(store: ShopifyStore) -> Self {
        let [shop, token, location_id] = store.env_vars();
        Self {
            store,
            shop: env_value(shop),
            token: env_value(token),
            location_id: env_value(location_id),
            delay: delay_from_env(store.delay_env_var(), store.default_delay()),
        }
    }

    pub fn credentials(&self) -> Result<ShopifyCredentials, ConfigError> {
        match (&self.shop, &self.token, &self.location_id) {
            (Some(shop), Some(token), Some(location_id)) => Ok(ShopifyCredentials {
                shop: shop.clone(),
                token: token.clone(),
                location_id: location_id.clone(),
            }),
            (shop, token, location_id) => {
                let names = self.store.env_vars();
                Err(ConfigError::Missing {
                    marketplace: self.store.name(),
                    vars: [shop.is_none(), token.is_none(), location_id.is_none()]
                        .into_iter()
                        .zip(names)
                        .filter_map(|(missing, name)| missing.then_some(name))
                        .collect(),
                })
            }
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn delay_from_env(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
