use std::{collections::HashMap, path::Path};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("unable to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed csv at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        CsvError::Malformed {
            line: err.position().map(|pos| pos.line()).unwrap_or(0),
            message: err.to_string(),
        }
    }
}

/// Lowercases a header and drops every whitespace character, so
/// `"MP SKU"`, `"mp sku"` and `" Mp\tSku "` all become `"mpsku"`.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// One data row keyed by normalized header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRow {
    line: u64,
    fields: HashMap<String, String>,
}

impl NormalizedRow {
    pub fn new(line: u64, fields: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            line,
            fields: fields
                .into_iter()
                .map(|(key, value)| (normalize_key(&key), value))
                .collect(),
        }
    }

    /// Line of the record in the uploaded file (the header is line 1).
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Value of the first candidate header present in the row, `""` if none
    /// is.
    pub fn field(&self, candidates: &[&str]) -> &str {
        candidates
            .iter()
            .find_map(|candidate| self.fields.get(&normalize_key(candidate)))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Like [`field`](Self::field) but skips candidates holding blank values.
    pub fn first_non_empty(&self, candidates: &[&str]) -> &str {
        candidates
            .iter()
            .filter_map(|candidate| self.fields.get(&normalize_key(candidate)))
            .map(String::as_str)
            .find(|value| !value.trim().is_empty())
            .unwrap_or("")
    }
}

/// Parses an uploaded CSV into normalized rows. The header row names the
/// fields, blank lines are skipped, short or long rows are kept. Either
/// every row parses or none is returned.
pub fn parse_rows(text: &str) -> Result<Vec<NormalizedRow>, CsvError> {
    let text = text.trim_start_matches('\u{FEFF}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(str::is_empty) && record.len() <= 1 {
            continue;
        }
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.clone(), value.to_string()));
        rows.push(NormalizedRow::new(line, fields));
    }

    debug!(
        target = "inventory.csv",
        columns = headers.len(),
        rows = rows.len(),
        "csv normalized"
    );
    Ok(rows)
}

/// Reads the whole file before parsing it.
pub async fn read_file(path: impl AsRef<Path>) -> Result<Vec<NormalizedRow>, CsvError> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_rows(&text)
}
