use crate::directory::SkuDirectories;
use crate::inventory::marketplace::{Marketplace, ShopifyStore};
use crate::inventory::normalize::NormalizedRow;
use crate::inventory::records::{
    FSN_NOT_FOUND, FlipkartRecord, JiomartRecord, MarketplaceRecord, ShopifyRecord,
};
use serde::Serialize;
use tracing::debug;

pub const MARKETPLACE_FIELD: &[&str] = &["Marketplace"];
pub const SKU_FIELD: &[&str] = &["MP SKU"];
pub const QUANTITY_FIELDS: &[&str] = &["MVQ-No Threshold", "MP Allotment"];

/// SKUs from the PT family are only listed once stock clears this level.
pub const PT_MIN_VIABLE_QTY: u32 = 5;
pub const PT_THRESHOLD: u32 = 5;

pub const JIOMART_DEFAULT_BRANCH: &str = "3P2SUOA2FC02";
pub const JIOMART_DEFAULT_ORIGIN: &str = "India";
pub const JIOMART_DEFAULT_TIME_UNIT: &str = "Days";

/// One record list per marketplace, each in upload order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedInventory {
    pub flipkart: Vec<FlipkartRecord>,
    pub shopify: Vec<ShopifyRecord>,
    pub vitashop: Vec<ShopifyRecord>,
    pub naturtint: Vec<ShopifyRecord>,
    pub jiomart: Vec<JiomartRecord>,
}

impl ParsedInventory {
    pub fn len(&self) -> usize {
        self.flipkart.len()
            + self.shopify.len()
            + self.vitashop.len()
            + self.naturtint.len()
            + self.jiomart.len()
    }

    fn count(&self, marketplace: Marketplace) -> usize {
        match marketplace {
            Marketplace::Flipkart => self.flipkart.len(),
            Marketplace::Ptfs => self.shopify.len(),
            Marketplace::Vitashop => self.vitashop.len(),
            Marketplace::Naturtint => self.naturtint.len(),
            Marketplace::Jiomart => self.jiomart.len(),
        }
    }

    fn push(&mut self, record: MarketplaceRecord) {
        match record {
            MarketplaceRecord::Flipkart(record) => self.flipkart.push(record),
            MarketplaceRecord::Shopify(ShopifyStore::Ptfs, record) => self.shopify.push(record),
            MarketplaceRecord::Shopify(ShopifyStore::Vitashop, record) => {
                self.vitashop.push(record)
            }
            MarketplaceRecord::Shopify(ShopifyStore::Naturtint, record) => {
                self.naturtint.push(record)
            }
            MarketplaceRecord::Jiomart(record) => self.jiomart.push(record),
        }
    }
}

/// Splits normalized rows by marketplace and derives each marketplace's
/// record. Rows with an unknown marketplace are dropped.
pub fn project(rows: &[NormalizedRow], directories: &SkuDirectories) -> ParsedInventory {
    let mut parsed = ParsedInventory::default();
    let mut dropped = 0usize;
    for row in rows {
        let raw_marketplace = row.field(MARKETPLACE_FIELD);
        let Some(marketplace) = Marketplace::classify(raw_marketplace) else {
            dropped += 1;
            continue;
        };
        let row_num = parsed.count(marketplace) + 2;
        parsed.push(project_row(row, marketplace, row_num, directories));
    }
    debug!(
        target = "inventory.csv",
        flipkart = parsed.flipkart.len(),
        ptfs = parsed.shopify.len(),
        vitashop = parsed.vitashop.len(),
        naturtint = parsed.naturtint.len(),
        jiomart = parsed.jiomart.len(),
        dropped,
        "rows projected"
    );
    parsed
}

fn project_row(
    row: &NormalizedRow,
    marketplace: Marketplace,
    row_num: usize,
    directories: &SkuDirectories,
) -> MarketplaceRecord {
    let sku = row.field(SKU_FIELD).trim().to_string();
    let qty = derive_quantity(&sku, row.first_non_empty(QUANTITY_FIELDS));
    let threshold = threshold_flag(&sku);
    let raw_marketplace = row.field(MARKETPLACE_FIELD).to_string();
    let source_line = row.line();

    match marketplace {
        Marketplace::Flipkart => MarketplaceRecord::Flipkart(FlipkartRecord {
            fsn: directories
                .flipkart
                .get(&sku)
                .cloned()
                .unwrap_or_else(|| FSN_NOT_FOUND.to_string()),
            sku,
            qty: Some(qty),
            threshold,
            row_num,
            source_line,
            marketplace: raw_marketplace,
        }),
        Marketplace::Ptfs | Marketplace::Vitashop | Marketplace::Naturtint => {
            let store = match marketplace {
                Marketplace::Vitashop => ShopifyStore::Vitashop,
                Marketplace::Naturtint => ShopifyStore::Naturtint,
                _ => ShopifyStore::Ptfs,
            };
            let entry = directories.shopify(store).get(&sku).cloned().unwrap_or_default();
            let record = ShopifyRecord {
                sku,
                variant_id: entry.variant_id,
                inv_id: entry.inv_id,
                qty: Some(qty),
                threshold,
                price: entry.price,
                mrp: entry.mrp,
                row_num,
                source_line,
                marketplace: raw_marketplace,
            };
            MarketplaceRecord::Shopify(store, record)
        }
        Marketplace::Jiomart => {
            let entry = directories.jiomart.get(&sku).cloned().unwrap_or_default();
            MarketplaceRecord::Jiomart(JiomartRecord {
                stock_sku: entry.stock_sku.unwrap_or_default(),
                branch: non_blank(entry.branch, JIOMART_DEFAULT_BRANCH),
                inventory_sku: entry.inventory_sku.unwrap_or_default(),
                qty,
                threshold,
                min_lead_time: Some(non_zero(entry.min_lead_time, 1)),
                max_lead_time: Some(non_zero(entry.max_lead_time, 2)),
                lead_time_unit: Some(non_blank(entry.lead_time_unit, JIOMART_DEFAULT_TIME_UNIT)),
                min_ship_time: Some(non_zero(entry.min_ship_time, 1)),
                max_ship_time: Some(non_zero(entry.max_ship_time, 2)),
                shipping_time_unit: Some(non_blank(
                    entry.shipping_time_unit,
                    JIOMART_DEFAULT_TIME_UNIT,
                )),
                origin: Some(non_blank(entry.origin, JIOMART_DEFAULT_ORIGIN)),
                row_num,
                source_line,
                marketplace: raw_marketplace,
                sku,
                ..JiomartRecord::default()
            })
        }
    }
}

/// Quantity to push for a SKU. PT-prefixed SKUs only list stock above
/// [`PT_MIN_VIABLE_QTY`]; everything else passes through untouched.
pub fn derive_quantity(sku: &str, raw: &str) -> u32 {
    if sku.is_empty() {
        return 0;
    }
    let parsed = parse_int_prefix(raw).unwrap_or(0);
    if has_pt_prefix(sku) {
        if parsed > PT_MIN_VIABLE_QTY { parsed } else { 0 }
    } else {
        parsed
    }
}

/// Reporting threshold: set whenever "PT" appears anywhere in the SKU.
/// Deliberately not the same test as the quantity rule's prefix match.
pub fn threshold_flag(sku: &str) -> u32 {
    if sku.to_uppercase().contains("PT") {
        PT_THRESHOLD
    } else {
        0
    }
}

fn has_pt_prefix(sku: &str) -> bool {
    sku.get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("PT"))
}

/// Reads a leading integer the way spreadsheet exports tend to need it:
/// surrounding whitespace and trailing text (`"12 pcs"`, `"7.0"`) are
/// ignored, negatives clamp to zero.
fn parse_int_prefix(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(digits[..end].parse::<u32>().unwrap_or(u32::MAX))
}

fn non_blank(value: Option<String>, default: &str) -> String {
    value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn non_zero(value: Option<u32>, default: u32) -> u32 {
    value.filter(|value| *value > 0).unwrap_or(default)
}
