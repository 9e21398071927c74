use crate::inventory::{JiomartRecord, Marketplace};
use crate::submit::{StatusMap, SubmissionReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Body of every submit route. `updateMrp` also pushes price and MRP where
/// the marketplace supports it.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionRequest<R> {
    #[serde(default = "Vec::new")]
    pub inventory: Vec<R>,
    #[serde(default, rename = "updateMrp")]
    pub update_mrp: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub status: StatusMap,
    pub summary: SubmissionSummary,
}

#[derive(Debug, Serialize)]
pub struct SubmissionSummary {
    pub submission_id: Uuid,
    pub marketplace: Marketplace,
    /// Records received, duplicates included.
    pub records: usize,
    /// Distinct SKUs; `succeeded + failed == total`.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl SubmissionResponse {
    pub fn new(
        submission_id: Uuid,
        marketplace: Marketplace,
        report: &SubmissionReport,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            status: report.status_map(),
            summary: SubmissionSummary {
                submission_id,
                marketplace,
                records: report.len(),
                total: report.sku_count(),
                succeeded: report.succeeded(),
                failed: report.failed(),
                elapsed_ms,
                finished_at: Utc::now(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub inventory: Vec<JiomartRecord>,
}
