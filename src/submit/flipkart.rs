use crate::config::FlipkartCredentials;
use crate::inventory::{FlipkartRecord, Marketplace};
use crate::submit::{Outcome, Stage, SubmissionReport, pause};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, warn};

/// The listings API takes at most this many SKUs per inventory update.
pub const BATCH_SIZE: usize = 5;

const UPDATE_INVENTORY_PATH: &str = "/sellers/listings/v3/update/inventory";

#[derive(Debug, Serialize)]
struct InventoryUpdate<'a> {
    product_id: &'a str,
    locations: Vec<LocationInventory<'a>>,
}

#[derive(Debug, Serialize)]
struct LocationInventory<'a> {
    id: &'a str,
    inventory: u32,
}

/// Pushes Flipkart quantities in bulk, one request per batch of
/// [`BATCH_SIZE`] records, pausing after every request.
pub struct FlipkartSubmitter {
    http: Client,
    credentials: FlipkartCredentials,
    delay: Duration,
}

impl FlipkartSubmitter {
    pub fn new(http: Client, credentials: FlipkartCredentials, delay: Duration) -> Self {
        Self {
            http,
            credentials,
            delay,
        }
    }

    pub async fn submit(&self, records: &[FlipkartRecord]) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        for batch in records.chunks(BATCH_SIZE) {
            let mut outcomes: Vec<Option<Outcome>> = batch.iter().map(local_failure).collect();

            let payload: BTreeMap<&str, InventoryUpdate<'_>> = batch
                .iter()
                .zip(&outcomes)
                .filter(|(_, outcome)| outcome.is_none())
                .filter_map(|(record, _)| {
                    let update = InventoryUpdate {
                        product_id: record.fsn.trim(),
                        locations: vec![LocationInventory {
                            id: &self.credentials.location_id,
                            inventory: record.qty?,
                        }],
                    };
                    Some((record.sku.trim(), update))
                })
                .collect();

            if !payload.is_empty() {
                let sent = self.send_batch(&payload).await;
                for (record, slot) in batch.iter().zip(outcomes.iter_mut()) {
                    if slot.is_none() {
                        *slot = Some(sent.outcome_for(record.sku.trim()));
                    }
                }
                pause(self.delay).await;
            }

            for (record, outcome) in batch.iter().zip(outcomes) {
                if let Some(outcome) = outcome {
                    report.push(record.sku.trim(), outcome);
                }
            }
        }
        report
    }

    async fn send_batch(&self, payload: &BTreeMap<&str, InventoryUpdate<'_>>) -> BatchResult {
        let url = format!("{}{UPDATE_INVENTORY_PATH}", self.credentials.api_root);
        let response = match self
            .http
            .post(url)
            .bearer_auth(&self.credentials.token)
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    target = "inventory.submit",
                    marketplace = "flipkart",
                    skus = payload.len(),
                    error = %err,
                    "batch request failed"
                );
                return BatchResult::Failed(Outcome::Transport {
                    stage: Stage::Batch,
                    detail: err.to_string(),
                });
            }
        };

        let status = response.status();
        crate::metrics::remote_call(Marketplace::Flipkart, Stage::Batch.as_str(), status.as_u16());
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                return BatchResult::Failed(Outcome::Transport {
                    stage: Stage::Batch,
                    detail: err.to_string(),
                });
            }
        };
        let parsed = serde_json::from_str::<Value>(&body);

        if !status.is_success() {
            let detail = parsed
                .as_ref()
                .ok()
                .and_then(|json| json.pointer("/errors/0"))
                .and_then(error_message)
                .unwrap_or_else(|| status.to_string());
            warn!(
                target = "inventory.submit",
                marketplace = "flipkart",
                status = status.as_u16(),
                detail = %detail,
                "batch rejected"
            );
            return BatchResult::Failed(Outcome::Remote {
                stage: Stage::Batch,
                detail,
            });
        }

        match parsed {
            Ok(json) => {
                debug!(
                    target = "inventory.submit",
                    marketplace = "flipkart",
                    skus = payload.len(),
                    "batch accepted"
                );
                BatchResult::Accepted(json)
            }
            Err(err) => BatchResult::Failed(Outcome::Remote {
                stage: Stage::Batch,
                detail: format!("unreadable response: {err}"),
            }),
        }
    }
}

/// Records that fail here are reported without being sent.
fn local_failure(record: &FlipkartRecord) -> Option<Outcome> {
    if !record.has_fsn() {
        Some(Outcome::invalid("FSN missing"))
    } else if record.qty.is_none() {
        Some(Outcome::invalid("Missing qty"))
    } else {
        None
    }
}

enum BatchResult {
    Accepted(Value),
    Failed(Outcome),
}

impl BatchResult {
    /// Status of one SKU from the shared batch response.
    fn outcome_for(&self, sku: &str) -> Outcome {
        match self {
            BatchResult::Failed(outcome) => outcome.clone(),
            BatchResult::Accepted(body) => match sku_error(body, sku) {
                Some(detail) => Outcome::Remote {
                    stage: Stage::Batch,
                    detail,
                },
                None => Outcome::Succeeded { echo: None },
            },
        }
    }
}

/// Per-SKU error inside a successful bulk response, if any.
fn sku_error(body: &Value, sku: &str) -> Option<String> {
    let entry = body.get(sku)?;
    if let Some(message) = entry
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(error_message)
    {
        return Some(message);
    }
    match entry.get("status").and_then(Value::as_str) {
        Some(status) if !status.eq_ignore_ascii_case("SUCCESS") => Some(status.to_string()),
        _ => None,
    }
}

fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => fields
            .get("message")
            .or_else(|| fields.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(error.to_string())),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
