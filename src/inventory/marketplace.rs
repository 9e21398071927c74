use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every marketplace a row of the upload can be routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Marketplace {
    Flipkart,
    Ptfs,
    Vitashop,
    Naturtint,
    Jiomart,
}

const FLIPKART_CODES: &[&str] = &["sf_flipkart/flipkart_fc", "sf_flipkart"];

impl Marketplace {
    /// Marketplaces updated over the network, one submission lock each.
    pub const LIVE: [Marketplace; 4] = [
        Marketplace::Flipkart,
        Marketplace::Ptfs,
        Marketplace::Vitashop,
        Marketplace::Naturtint,
    ];

    /// Routes a raw `Marketplace` column value. Flipkart needs an exact
    /// code, the others match on substring; first match wins.
    pub fn classify(raw: &str) -> Option<Self> {
        let value = raw.to_lowercase();
        if FLIPKART_CODES.contains(&value.trim()) {
            return Some(Marketplace::Flipkart);
        }
        [
            ("ptfs", Marketplace::Ptfs),
            ("vitashop", Marketplace::Vitashop),
            ("naturtint", Marketplace::Naturtint),
            ("jiomart", Marketplace::Jiomart),
        ]
        .into_iter()
        .find(|(needle, _)| value.contains(needle))
        .map(|(_, marketplace)| marketplace)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Marketplace::Flipkart => "flipkart",
            Marketplace::Ptfs => "ptfs",
            Marketplace::Vitashop => "vitashop",
            Marketplace::Naturtint => "naturtint",
            Marketplace::Jiomart => "jiomart",
        }
    }
}

impl From<ShopifyStore> for Marketplace {
    fn from(store: ShopifyStore) -> Self {
        match store {
            ShopifyStore::Ptfs => Marketplace::Ptfs,
            ShopifyStore::Vitashop => Marketplace::Vitashop,
            ShopifyStore::Naturtint => Marketplace::Naturtint,
        }
    }
}

/// Where a store's submitter takes the inventory item and variant ids from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierSource {
    /// Ids travel on the record itself (filled from the directory at upload).
    Record,
    /// Ids are looked up again in the store's directory at submission time.
    Directory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShopifyStore {
    Ptfs,
    Vitashop,
    Naturtint,
}

impl ShopifyStore {
    pub fn name(&self) -> &'static str {
        Marketplace::from(*self).as_str()
    }

    /// Name the operators know the store's SKU directory by.
    pub fn directory_name(&self) -> &'static str {
        match self {
            ShopifyStore::Ptfs => "shopifyMap",
            ShopifyStore::Vitashop => "vitashopMap",
            ShopifyStore::Naturtint => "naturtintMap",
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            ShopifyStore::Ptfs => "2023-01",
            ShopifyStore::Vitashop | ShopifyStore::Naturtint => "2023-04",
        }
    }

    pub fn identifier_source(&self) -> IdentifierSource {
        match self {
            ShopifyStore::Ptfs => IdentifierSource::Record,
            ShopifyStore::Vitashop | ShopifyStore::Naturtint => IdentifierSource::Directory,
        }
    }

    /// Stores whose inventory items must be connected to the location
    /// before `inventory_levels/set` accepts them.
    pub fn connects_location(&self) -> bool {
        matches!(self, ShopifyStore::Vitashop | ShopifyStore::Naturtint)
    }

    /// `(shop, token, location id)` env var names.
    pub fn env_vars(&self) -> [&'static str; 3] {
        match self {
            ShopifyStore::Ptfs => ["SHOPIFY_SHOP", "SHOPIFY_API_TOKEN", "SHOPIFY_LOCATION_ID"],
            ShopifyStore::Vitashop => [
                "VITASHOP_SHOPIFY_SHOP",
                "VITASHOP_API_TOKEN",
                "VITASHOP_LOCATION_ID",
            ],
            ShopifyStore::Naturtint => [
                "NATURTINT_SHOPIFY_SHOP",
                "NATURTINT_API_TOKEN",
                "NATURTINT_LOCATION_ID",
            ],
        }
    }

    pub fn delay_env_var(&self) -> &'static str {
        match self {
            ShopifyStore::Ptfs => "PTFS_REQUEST_DELAY_MS",
            ShopifyStore::Vitashop => "VITASHOP_REQUEST_DELAY_MS",
            ShopifyStore::Naturtint => "NATURTINT_REQUEST_DELAY_MS",
        }
    }

    /// Pause between records; PTFS sits on the stricter 2 req/s plan.
    pub fn default_delay(&self) -> Duration {
        match self {
            ShopifyStore::Ptfs => Duration::from_millis(500),
            ShopifyStore::Vitashop | ShopifyStore::Naturtint => Duration::from_millis(200),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipkart_requires_exact_code() {
        assert_eq!(
            Marketplace::classify(" SF_Flipkart "),
            Some(Marketplace::Flipkart)
        );
        assert_eq!(
            Marketplace::classify("sf_flipkart/flipkart_fc"),
            Some(Marketplace::Flipkart)
        );
        assert_eq!(Marketplace::classify("flipkart"), None);
        assert_eq!(Marketplace::classify("sf_flipkart_extra"), None);
    }

    #[test]
    fn substring_marketplaces_match_anywhere() {
        assert_eq!(Marketplace::classify("SF_PTFS"), Some(Marketplace::Ptfs));
        assert_eq!(
            Marketplace::classify("VitaShop India"),
            Some(Marketplace::Vitashop)
        );
        assert_eq!(
            Marketplace::classify("naturtint-d2c"),
            Some(Marketplace::Naturtint)
        );
        assert_eq!(Marketplace::classify("JioMart"), Some(Marketplace::Jiomart));
        assert_eq!(Marketplace::classify("amazon"), None);
        assert_eq!(Marketplace::classify(""), None);
    }

    #[test]
    fn a_row_lands_in_one_marketplace_only() {
        assert_eq!(
            Marketplace::classify("ptfs_vitashop"),
            Some(Marketplace::Ptfs)
        );
    }

    #[test]
    fn stores_route_to_their_marketplace() {
        assert_eq!(Marketplace::from(ShopifyStore::Vitashop), Marketplace::Vitashop);
        assert_eq!(ShopifyStore::Naturtint.directory_name(), "naturtintMap");
        assert_eq!(
            ShopifyStore::Ptfs.identifier_source(),
            IdentifierSource::Record
        );
        assert!(!ShopifyStore::Ptfs.connects_location());
    }
}
