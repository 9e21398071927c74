pub mod marketplace;
pub mod normalize;
pub mod project;
pub mod records;

pub use marketplace::{IdentifierSource, Marketplace, ShopifyStore};
pub use normalize::{CsvError, NormalizedRow, parse_rows, read_file};
pub use project::{ParsedInventory, project};
pub use records::{FlipkartRecord, JiomartRecord, ShopifyRecord};
