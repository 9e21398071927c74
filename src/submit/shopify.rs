use crate::config::ShopifyCredentials;
use crate::directory::SkuDirectories;
use crate::inventory::records::format_amount;
use crate::inventory::{IdentifierSource, ShopifyRecord, ShopifyStore};
use crate::submit::{Outcome, Stage, SubmissionReport, pause};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};
use urlencoding::encode;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

#[derive(Debug, Serialize)]
struct ConnectRequest {
    location_id: Value,
    inventory_item_id: Value,
    relocate_if_necessary: bool,
}

#[derive(Debug, Serialize)]
struct SetLevelRequest {
    location_id: Value,
    inventory_item_id: Value,
    available: u32,
}

#[derive(Debug, Serialize)]
struct VariantUpdate {
    variant: VariantFields,
}

#[derive(Debug, Serialize)]
struct VariantFields {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compare_at_price: Option<String>,
}

/// Ids and amounts resolved for one record before anything is sent.
#[derive(Debug)]
struct Target {
    inv_id: String,
    qty: u32,
    variant_id: String,
    price: Option<f64>,
    mrp: Option<f64>,
}

/// Pushes quantities (and optionally price/MRP) to one Shopify store, one
/// record at a time.
pub struct ShopifySubmitter {
    http: Client,
    store: ShopifyStore,
    credentials: ShopifyCredentials,
    directories: Arc<SkuDirectories>,
    delay: Duration,
}

impl ShopifySubmitter {
    pub fn new(
        http: Client,
        store: ShopifyStore,
        credentials: ShopifyCredentials,
        directories: Arc<SkuDirectories>,
        delay: Duration,
    ) -> Self {
        Self {
            http,
            store,
            credentials,
            directories,
            delay,
        }
    }

    pub async fn submit(
        &self,
        records: &[ShopifyRecord],
        update_price: bool,
    ) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        for record in records {
            let sku = record.sku.trim();
            let target = match self.resolve(record) {
                Ok(target) => target,
                Err(outcome) => {
                    debug!(
                        target = "inventory.submit",
                        marketplace = self.store.name(),
                        sku = sku,
                        status = %outcome,
                        "record skipped"
                    );
                    report.push(sku, outcome);
                    continue;
                }
            };
            let outcome = self.push_record(sku, &target, update_price).await;
            if !outcome.is_success() {
                warn!(
                    target = "inventory.submit",
                    marketplace = self.store.name(),
                    sku = sku,
                    status = %outcome,
                    "record failed"
                );
            }
            report.push(sku, outcome);
            pause(self.delay).await;
        }
        report
    }

    /// Nothing is sent for a record whose inventory item id or quantity is
    /// unknown.
    fn resolve(&self, record: &ShopifyRecord) -> Result<Target, Outcome> {
        let missing = || Outcome::invalid("Missing inv_id or qty");
        match self.store.identifier_source() {
            IdentifierSource::Record => {
                let inv_id = record.inv_id.trim();
                let qty = record.qty.ok_or_else(missing)?;
                if inv_id.is_empty() {
                    return Err(missing());
                }
                Ok(Target {
                    inv_id: inv_id.to_string(),
                    qty,
                    variant_id: record.variant_id.trim().to_string(),
                    price: record.price,
                    mrp: record.mrp,
                })
            }
            IdentifierSource::Directory => {
                let entry = self
                    .directories
                    .shopify(self.store)
                    .get(record.sku.trim())
                    .ok_or_else(|| {
                        Outcome::invalid(format!(
                            "SKU not found in {}",
                            self.store.directory_name()
                        ))
                    })?;
                let inv_id = entry.inv_id.trim();
                let qty = record.qty.ok_or_else(missing)?;
                if inv_id.is_empty() {
                    return Err(missing());
                }
                Ok(Target {
                    inv_id: inv_id.to_string(),
                    qty,
                    variant_id: entry.variant_id.trim().to_string(),
                    price: record.price.or(entry.price),
                    mrp: record.mrp.or(entry.mrp),
                })
            }
        }
    }

    async fn push_record(&self, sku: &str, target: &Target, update_price: bool) -> Outcome {
        if self.store.connects_location() {
            self.connect(sku, target).await;
        }

        let request = self
            .http
            .post(self.endpoint("inventory_levels/set.json"))
            .json(&SetLevelRequest {
                location_id: id_value(&self.credentials.location_id),
                inventory_item_id: id_value(&target.inv_id),
                available: target.qty,
            });
        let (status, body) = match self.send(request, Stage::Quantity).await {
            Ok(reply) => reply,
            Err(detail) => {
                return Outcome::Transport {
                    stage: Stage::Quantity,
                    detail,
                };
            }
        };
        if !status.is_success() {
            return Outcome::Remote {
                stage: Stage::Quantity,
                detail: format!("{} - {body}", status.as_u16()),
            };
        }

        let echo = serde_json::from_str::<Value>(&body).ok();
        if let Some(json) = &echo {
            if !echo_matches(json, target.qty) {
                return Outcome::Mismatch { body };
            }
        }

        let has_amount = target.price.is_some() || target.mrp.is_some();
        if update_price && !target.variant_id.is_empty() && has_amount {
            if let Some(failure) = self.update_price(target).await {
                return failure;
            }
        }

        Outcome::Succeeded {
            echo: echo.map(|json| json.to_string()),
        }
    }

    /// Attaches the inventory item to the location. Failures are only
    /// logged; the quantity call reports the real problem.
    async fn connect(&self, sku: &str, target: &Target) {
        let request = self
            .http
            .post(self.endpoint("inventory_levels/connect.json"))
            .header(ACCESS_TOKEN_HEADER, &self.credentials.token)
            .json(&ConnectRequest {
                location_id: id_value(&self.credentials.location_id),
                inventory_item_id: id_value(&target.inv_id),
                relocate_if_necessary: true,
            });
        match request.send().await {
            Ok(response) => {
                let status = response.status();
                crate::metrics::remote_call(self.store.into(), "connect", status.as_u16());
                let body = response.text().await.unwrap_or_default();
                debug!(
                    target = "inventory.submit",
                    marketplace = self.store.name(),
                    sku = sku,
                    status = status.as_u16(),
                    body = %body,
                    "location connect"
                );
            }
            Err(err) => {
                warn!(
                    target = "inventory.submit",
                    marketplace = self.store.name(),
                    sku = sku,
                    error = %err,
                    "location connect failed"
                );
            }
        }
    }

    async fn update_price(&self, target: &Target) -> Option<Outcome> {
        let path = format!("variants/{}.json", encode(&target.variant_id));
        let request = self.http.put(self.endpoint(&path)).json(&VariantUpdate {
            variant: VariantFields {
                id: id_value(&target.variant_id),
                price: target.price.map(format_amount),
                compare_at_price: target.mrp.map(format_amount),
            },
        });
        match self.send(request, Stage::Price).await {
            Ok((status, _)) if status.is_success() => None,
            Ok((status, body)) => Some(Outcome::Remote {
                stage: Stage::Price,
                detail: format!("{} - {body}", status.as_u16()),
            }),
            Err(detail) => Some(Outcome::Transport {
                stage: Stage::Price,
                detail,
            }),
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        stage: Stage,
    ) -> Result<(StatusCode, String), String> {
        let response = request
            .header(ACCESS_TOKEN_HEADER, &self.credentials.token)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = response.status();
        crate::metrics::remote_call(self.store.into(), stage.as_str(), status.as_u16());
        let body = response.text().await.map_err(|err| err.to_string())?;
        Ok((status, body))
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/admin/api/{}/{path}",
            self.credentials.base_url(),
            self.store.api_version()
        )
    }
}

/// Shopify ids are numeric; anything else is passed through as text.
fn id_value(id: &str) -> Value {
    match id.trim().parse::<u64>() {
        Ok(number) => Value::from(number),
        Err(_) => Value::from(id.trim()),
    }
}

/// True unless the response echoes an `available` that differs from the
/// requested quantity.
fn echo_matches(body: &Value, requested: u32) -> bool {
    let available = body
        .get("available")
        .or_else(|| body.pointer("/inventory_level/available"));
    match available {
        None => true,
        Some(Value::Number(number)) => number.as_f64() == Some(f64::from(requested)),
        Some(Value::String(text)) => {
            text.trim().parse::<f64>().ok() == Some(f64::from(requested))
        }
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::ShopifyEntry;
    use crate::submit::mock::{MockMarketplace, Reply, test_client};
    use axum::http::Method;
    use serde_json::json;
    use tokio::time::Instant;

    fn record(sku: &str, qty: u32) -> ShopifyRecord {
        ShopifyRecord {
            sku: sku.to_string(),
            variant_id: String::new(),
            inv_id: String::new(),
            qty: Some(qty),
            threshold: 0,
            price: None,
            mrp: None,
            row_num: 2,
            source_line: 2,
            marketplace: "Shopify_Vitashop".into(),
        }
    }

    fn directories() -> Arc<SkuDirectories> {
        let mut directories = SkuDirectories::default();
        directories.vitashop.insert(
            "VS-BIOTIN-60".into(),
            ShopifyEntry {
                variant_id: "44120000001".into(),
                inv_id: "46210000001".into(),
                price: Some(499.0),
                mrp: Some(650.0),
            },
        );
        directories.vitashop.insert(
            "VS-ZINC-90".into(),
            ShopifyEntry {
                variant_id: "44120000002".into(),
                ..ShopifyEntry::default()
            },
        );
        Arc::new(directories)
    }

    fn submitter(mock: &MockMarketplace, store: ShopifyStore) -> ShopifySubmitter {
        paced_submitter(mock, store, Duration::ZERO)
    }

    fn paced_submitter(
        mock: &MockMarketplace,
        store: ShopifyStore,
        delay: Duration,
    ) -> ShopifySubmitter {
        ShopifySubmitter::new(
            test_client(),
            store,
            ShopifyCredentials {
                shop: mock.base_url.clone(),
                token: "shpat_test".into(),
                location_id: "81234567890".into(),
            },
            directories(),
            delay,
        )
    }

    fn echo_requested(call: &crate::submit::mock::RecordedCall) -> Reply {
        if call.path.ends_with("inventory_levels/set.json") {
            Reply::Json(
                axum::http::StatusCode::OK,
                json!({"inventory_level": {"available": call.body["available"].clone()}}),
            )
        } else {
            Reply::Json(axum::http::StatusCode::OK, json!({}))
        }
    }

    #[tokio::test]
    async fn unknown_sku_makes_no_calls() {
        let mock = MockMarketplace::start(|call, _| echo_requested(call)).await;
        let report = submitter(&mock, ShopifyStore::Vitashop)
            .submit(&[record("ABC-1", 4)], true)
            .await;
        assert!(mock.calls().await.is_empty());
        assert_eq!(report.status_map()["ABC-1"], "❌ SKU not found in vitashopMap");
    }

    #[tokio::test]
    async fn directory_store_connects_then_sets_then_prices() {
        let mock = MockMarketplace::start(|call, _| echo_requested(call)).await;
        let report = submitter(&mock, ShopifyStore::Vitashop)
            .submit(&[record("VS-BIOTIN-60", 12)], true)
            .await;

        let calls = mock.calls().await;
        let paths: Vec<&str> = calls.iter().map(|call| call.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/admin/api/2023-04/inventory_levels/connect.json",
                "/admin/api/2023-04/inventory_levels/set.json",
                "/admin/api/2023-04/variants/44120000001.json",
            ]
        );
        assert_eq!(calls[0].body["relocate_if_necessary"], json!(true));
        assert_eq!(
            calls[1].body,
            json!({
                "location_id": 81234567890u64,
                "inventory_item_id": 46210000001u64,
                "available": 12
            })
        );
        assert_eq!(calls[1].token.as_deref(), Some("shpat_test"));
        assert_eq!(calls[2].method, Method::PUT);
        assert_eq!(
            calls[2].body,
            json!({
                "variant": {"id": 44120000001u64, "price": "499", "compare_at_price": "650"}
            })
        );
        assert_eq!(
            report.status_map()["VS-BIOTIN-60"],
            r#"✅ Success: {"inventory_level":{"available":12}}"#
        );
    }

    #[tokio::test]
    async fn echoed_mismatch_skips_price_update() {
        let mock = MockMarketplace::start(|call, _| {
            if call.path.ends_with("set.json") {
                Reply::Json(axum::http::StatusCode::OK, json!({"available": 3}))
            } else {
                Reply::Json(axum::http::StatusCode::OK, json!({}))
            }
        })
        .await;
        let report = submitter(&mock, ShopifyStore::Vitashop)
            .submit(&[record("VS-BIOTIN-60", 12)], true)
            .await;

        let calls = mock.calls().await;
        assert!(calls.iter().all(|call| !call.path.contains("/variants/")));
        let status = &report.status_map()["VS-BIOTIN-60"];
        assert!(status.starts_with("❌ Inventory not updated as expected"));
        assert!(status.ends_with(r#"Shopify returned: {"available":3}"#));
    }

    #[tokio::test]
    async fn price_failure_is_reported_at_price_stage() {
        let mock = MockMarketplace::start(|call, _| {
            if call.path.contains("/variants/") {
                Reply::Text(axum::http::StatusCode::UNPROCESSABLE_ENTITY, "price invalid".into())
            } else {
                echo_requested(call)
            }
        })
        .await;
        let report = submitter(&mock, ShopifyStore::Vitashop)
            .submit(&[record("VS-BIOTIN-60", 12)], true)
            .await;
        assert_eq!(
            report.status_map()["VS-BIOTIN-60"],
            "❌ Price/MRP update failed: 422 - price invalid"
        );
    }

    #[tokio::test]
    async fn price_is_left_alone_without_the_flag() {
        let mock = MockMarketplace::start(|call, _| echo_requested(call)).await;
        let report = submitter(&mock, ShopifyStore::Vitashop)
            .submit(&[record("VS-BIOTIN-60", 12)], false)
            .await;
        assert_eq!(mock.calls().await.len(), 2);
        assert!(report.status_map()["VS-BIOTIN-60"].starts_with("✅ Success"));
    }

    #[tokio::test]
    async fn record_store_requires_inventory_item_id() {
        let mock = MockMarketplace::start(|call, _| echo_requested(call)).await;
        let mut with_ids = record("PT-ALMOND-200", 9);
        with_ids.inv_id = "46219999001".into();
        with_ids.variant_id = "44129999001".into();
        with_ids.mrp = Some(349.5);
        let report = submitter(&mock, ShopifyStore::Ptfs)
            .submit(&[record("PT-ONION-100", 8), with_ids], true)
            .await;

        let calls = mock.calls().await;
        let paths: Vec<&str> = calls.iter().map(|call| call.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/admin/api/2023-01/inventory_levels/set.json",
                "/admin/api/2023-01/variants/44129999001.json",
            ]
        );
        assert_eq!(
            calls[1].body,
            json!({"variant": {"id": 44129999001u64, "compare_at_price": "349.5"}})
        );
        let status = report.status_map();
        assert_eq!(status["PT-ONION-100"], "❌ Missing inv_id or qty");
        assert!(status["PT-ALMOND-200"].starts_with("✅ Success"));
    }

    #[tokio::test]
    async fn directory_entry_without_inventory_item_makes_no_calls() {
        let mock = MockMarketplace::start(|call, _| echo_requested(call)).await;
        let report = submitter(&mock, ShopifyStore::Vitashop)
            .submit(&[record("VS-ZINC-90", 6)], true)
            .await;
        assert!(mock.calls().await.is_empty());
        assert_eq!(report.status_map()["VS-ZINC-90"], "❌ Missing inv_id or qty");
    }

    #[tokio::test]
    async fn missing_quantity_is_never_sent() {
        let mock = MockMarketplace::start(|call, _| echo_requested(call)).await;
        let mut mapped = record("VS-BIOTIN-60", 0);
        mapped.qty = None;
        let report = submitter(&mock, ShopifyStore::Vitashop)
            .submit(&[mapped], true)
            .await;
        assert_eq!(report.status_map()["VS-BIOTIN-60"], "❌ Missing inv_id or qty");

        let mut with_ids = record("PT-ALMOND-200", 0);
        with_ids.inv_id = "46219999001".into();
        with_ids.qty = None;
        let report = submitter(&mock, ShopifyStore::Ptfs).submit(&[with_ids], true).await;
        assert_eq!(report.status_map()["PT-ALMOND-200"], "❌ Missing inv_id or qty");
        assert!(mock.calls().await.is_empty());
    }

    #[tokio::test]
    async fn pauses_only_after_records_that_were_sent() {
        let delay = Duration::from_millis(250);
        let mock = MockMarketplace::start(|call, _| echo_requested(call)).await;
        let mut no_qty = record("VS-BIOTIN-60", 0);
        no_qty.qty = None;
        let records = [
            record("ABC-1", 4),
            no_qty,
            record("VS-ZINC-90", 2),
            record("VS-BIOTIN-60", 12),
        ];
        let started = Instant::now();
        let report = paced_submitter(&mock, ShopifyStore::Vitashop, delay)
            .submit(&records, false)
            .await;
        let elapsed = started.elapsed();
        assert_eq!(report.len(), 4);
        assert!(elapsed >= delay, "{elapsed:?}");
        assert!(elapsed < delay * 2, "{elapsed:?}");
    }

    #[tokio::test]
    async fn local_failures_do_not_pause() {
        let mock = MockMarketplace::start(|call, _| echo_requested(call)).await;
        let started = Instant::now();
        paced_submitter(&mock, ShopifyStore::Vitashop, Duration::from_secs(5))
            .submit(&[record("ABC-1", 4), record("VS-ZINC-90", 2)], false)
            .await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn rejected_quantity_reports_status_and_body() {
        let mock = MockMarketplace::start(|_, _| {
            Reply::Text(axum::http::StatusCode::NOT_FOUND, r#"{"errors":"Not Found"}"#.into())
        })
        .await;
        let mut item = record("PT-ALMOND-200", 9);
        item.inv_id = "46219999001".into();
        let report = submitter(&mock, ShopifyStore::Ptfs).submit(&[item], false).await;
        assert_eq!(
            report.status_map()["PT-ALMOND-200"],
            r#"❌ Qty update failed: 404 - {"errors":"Not Found"}"#
        );
    }

    #[tokio::test]
    async fn plain_text_success_has_no_echo() {
        let mock = MockMarketplace::start(|_, _| {
            Reply::Text(axum::http::StatusCode::OK, "ok".into())
        })
        .await;
        let mut item = record("PT-ALMOND-200", 9);
        item.inv_id = "46219999001".into();
        let report = submitter(&mock, ShopifyStore::Ptfs).submit(&[item], false).await;
        assert_eq!(report.status_map()["PT-ALMOND-200"], "✅ Success");
    }

    #[tokio::test]
    async fn stalled_quantity_call_is_an_exception() {
        let mock = MockMarketplace::start(|_, _| Reply::Stall(Duration::from_secs(2))).await;
        let mut item = record("PT-ALMOND-200", 9);
        item.inv_id = "46219999001".into();
        let report = submitter(&mock, ShopifyStore::Ptfs).submit(&[item], false).await;
        assert!(report.status_map()["PT-ALMOND-200"].starts_with("❌ Exception: "));
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn echo_check_reads_both_shapes() {
        assert!(echo_matches(&json!({"available": 7}), 7));
        assert!(echo_matches(&json!({"inventory_level": {"available": "7"}}), 7));
        assert!(echo_matches(&json!({"inventory_level": {"updated_at": "x"}}), 7));
        assert!(!echo_matches(&json!({"available": 6}), 7));
        assert!(!echo_matches(&json!({"available": null}), 7));
    }

    #[test]
    fn numeric_ids_are_sent_as_numbers() {
        assert_eq!(id_value(" 46210000001 "), json!(46210000001u64));
        assert_eq!(
            id_value("gid://shopify/InventoryItem/1"),
            json!("gid://shopify/InventoryItem/1")
        );
    }
}
