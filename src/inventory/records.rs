use crate::inventory::marketplace::ShopifyStore;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_with::{DefaultOnError, NoneAsEmptyString, PickFirst, serde_as};

/// FSN placeholder for SKUs missing from the Flipkart directory.
pub const FSN_NOT_FOUND: &str = "❌ FSN not found";

/// Quantities arrive from an editable table; a cleared or non-numeric
/// cell reads as `None` rather than failing the whole request.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlipkartRecord {
    pub sku: String,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub qty: Option<u32>,
    #[serde(default)]
    pub threshold: u32,
    #[serde(default)]
    pub fsn: String,
    #[serde(rename = "rowNum", default)]
    pub row_num: usize,
    #[serde(rename = "sourceLine", default)]
    pub source_line: u64,
    #[serde(default)]
    pub marketplace: String,
}

impl FlipkartRecord {
    pub fn has_fsn(&self) -> bool {
        let fsn = self.fsn.trim();
        !fsn.is_empty() && !fsn.starts_with('❌')
    }
}

/// Record shape shared by every Shopify-backed store.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopifyRecord {
    pub sku: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub variant_id: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub inv_id: String,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub qty: Option<u32>,
    #[serde(default)]
    pub threshold: u32,
    #[serde_as(as = "PickFirst<(Option<_>, NoneAsEmptyString)>")]
    #[serde(default)]
    pub price: Option<f64>,
    #[serde_as(as = "PickFirst<(Option<_>, NoneAsEmptyString)>")]
    #[serde(default)]
    pub mrp: Option<f64>,
    #[serde(rename = "rowNum", default)]
    pub row_num: usize,
    #[serde(rename = "sourceLine", default)]
    pub source_line: u64,
    #[serde(default)]
    pub marketplace: String,
}

/// JioMart has no API; these rows only feed the bulk-upload sheet. Field
/// names follow the sheet's column titles.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JiomartRecord {
    #[serde(rename = "Variant SKU")]
    pub sku: String,
    #[serde(rename = "Stock SKU", default)]
    pub stock_sku: String,
    #[serde(rename = "Fulfiller Branch Number", default)]
    pub branch: String,
    #[serde(rename = "Inventory SKU", default)]
    pub inventory_sku: String,
    #[serde(rename = "Batch Number", default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(rename = "Available quantity", default)]
    pub qty: u32,
    #[serde(rename = "Low Stock Threshold", default)]
    pub threshold: u32,
    #[serde(rename = "Multiplier", default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u32>,
    #[serde(rename = "Shelf life value", default, skip_serializing_if = "Option::is_none")]
    pub shelf_life_value: Option<String>,
    #[serde(rename = "Shelf life unit", default, skip_serializing_if = "Option::is_none")]
    pub shelf_life_unit: Option<String>,
    #[serde(rename = "Min lead time to source", default)]
    pub min_lead_time: Option<u32>,
    #[serde(rename = "Max lead time to source", default)]
    pub max_lead_time: Option<u32>,
    #[serde(rename = "Lead time unit", default)]
    pub lead_time_unit: Option<String>,
    #[serde(rename = "Min time to ship", default)]
    pub min_ship_time: Option<u32>,
    #[serde(rename = "Max time to ship", default)]
    pub max_ship_time: Option<u32>,
    #[serde(rename = "Shipping Time unit", default)]
    pub shipping_time_unit: Option<String>,
    #[serde(rename = "Best Before Buy Date", default, skip_serializing_if = "Option::is_none")]
    pub best_before: Option<String>,
    #[serde(rename = "Manufactured Date", default, skip_serializing_if = "Option::is_none")]
    pub manufactured: Option<String>,
    #[serde(
        rename = "Month and Year of Import",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub imported: Option<String>,
    #[serde(rename = "Country of Origin", default)]
    pub origin: Option<String>,
    #[serde(rename = "Notes", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "rowNum", default)]
    pub row_num: usize,
    #[serde(rename = "sourceLine", default)]
    pub source_line: u64,
    #[serde(default)]
    pub marketplace: String,
}

/// One projected upload row, tagged by the list it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketplaceRecord {
    Flipkart(FlipkartRecord),
    Shopify(ShopifyStore, ShopifyRecord),
    Jiomart(JiomartRecord),
}

/// Shopify ids show up as JSON numbers or strings depending on who wrote
/// the payload; null and anything else become empty.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    })
}

/// Formats an amount the way Shopify expects it in a variant payload.
pub fn format_amount(amount: f64) -> String {
    amount.to_string()
}
