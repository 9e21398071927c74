use crate::inventory::marketplace::ShopifyStore;
use crate::inventory::records::lenient_id;
use serde::Deserialize;
use serde_with::{NoneAsEmptyString, PickFirst, serde_as};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

const FLIPKART_JSON: &str = include_str!("../data/directories/flipkart.json");
const PTFS_JSON: &str = include_str!("../data/directories/ptfs.json");
const VITASHOP_JSON: &str = include_str!("../data/directories/vitashop.json");
const NATURTINT_JSON: &str = include_str!("../data/directories/naturtint.json");
const JIOMART_JSON: &str = include_str!("../data/directories/jiomart.json");

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid {name} directory: {source}")]
    Parse {
        name: &'static str,
        source: serde_json::Error,
    },
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShopifyEntry {
    #[serde(default, deserialize_with = "lenient_id")]
    pub variant_id: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub inv_id: String,
    #[serde_as(as = "PickFirst<(Option<_>, NoneAsEmptyString)>")]
    #[serde(default)]
    pub price: Option<f64>,
    #[serde_as(as = "PickFirst<(Option<_>, NoneAsEmptyString)>")]
    #[serde(default)]
    pub mrp: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JiomartEntry {
    #[serde(default)]
    pub stock_sku: Option<String>,
    #[serde(default)]
    pub inventory_sku: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub min_lead_time: Option<u32>,
    #[serde(default)]
    pub max_lead_time: Option<u32>,
    #[serde(default)]
    pub lead_time_unit: Option<String>,
    #[serde(default)]
    pub min_ship_time: Option<u32>,
    #[serde(default)]
    pub max_ship_time: Option<u32>,
    #[serde(default)]
    pub shipping_time_unit: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

/// Static SKU → marketplace identifier tables, loaded once at startup and
/// shared read-only afterwards. A missing key means the SKU is unknown to
/// that marketplace.
#[derive(Debug, Clone, Default)]
pub struct SkuDirectories {
    pub flipkart: HashMap<String, String>,
    pub ptfs: HashMap<String, ShopifyEntry>,
    pub vitashop: HashMap<String, ShopifyEntry>,
    pub naturtint: HashMap<String, ShopifyEntry>,
    pub jiomart: HashMap<String, JiomartEntry>,
}

impl SkuDirectories {
    /// Tables compiled into the binary.
    pub fn embedded() -> Result<Self, DirectoryError> {
        Ok(Self {
            flipkart: parse("flipkart", FLIPKART_JSON)?,
            ptfs: parse("ptfs", PTFS_JSON)?,
            vitashop: parse("vitashop", VITASHOP_JSON)?,
            naturtint: parse("naturtint", NATURTINT_JSON)?,
            jiomart: parse("jiomart", JIOMART_JSON)?,
        })
    }

    /// Reads `<name>.json` for every marketplace from `dir`.
    pub async fn load_dir(dir: &Path) -> Result<Self, DirectoryError> {
        Ok(Self {
            flipkart: parse("flipkart", &read(dir, "flipkart").await?)?,
            ptfs: parse("ptfs", &read(dir, "ptfs").await?)?,
            vitashop: parse("vitashop", &read(dir, "vitashop").await?)?,
            naturtint: parse("naturtint", &read(dir, "naturtint").await?)?,
            jiomart: parse("jiomart", &read(dir, "jiomart").await?)?,
        })
    }

    /// `SKU_DIRECTORY_DIR` when set, the embedded tables otherwise.
    pub async fn from_env() -> Result<Self, DirectoryError> {
        let directories = match std::env::var("SKU_DIRECTORY_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            Some(dir) => Self::load_dir(Path::new(dir.trim())).await?,
            None => Self::embedded()?,
        };
        info!(
            target = "inventory.directory",
            flipkart = directories.flipkart.len(),
            ptfs = directories.ptfs.len(),
            vitashop = directories.vitashop.len(),
            naturtint = directories.naturtint.len(),
            jiomart = directories.jiomart.len(),
            "sku directories loaded"
        );
        Ok(directories)
    }

    pub fn shopify(&self, store: ShopifyStore) -> &HashMap<String, ShopifyEntry> {
        match store {
            ShopifyStore::Ptfs => &self.ptfs,
            ShopifyStore::Vitashop => &self.vitashop,
            ShopifyStore::Naturtint => &self.naturtint,
        }
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<HashMap<String, T>, DirectoryError>
where
    T: for<'de> Deserialize<'de>,
{
    let table: HashMap<String, T> =
        serde_json::from_str(raw).map_err(|source| DirectoryError::Parse { name, source })?;
    Ok(table
        .into_iter()
        .map(|(sku, entry)| (sku.trim().to_string(), entry))
        .collect())
}

async fn read(dir: &Path, name: &str) -> Result<String, DirectoryError> {
    let path = dir.join(format!("{name}.json"));
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| DirectoryError::Read { path, source })
}
