use std::{collections::BTreeMap, fmt};

/// SKU → human-readable status, the shape the view layer renders.
pub type StatusMap = BTreeMap<String, String>;

/// Which remote call an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Quantity,
    Price,
    /// A bulk request covering several records at once.
    Batch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Quantity => "quantity",
            Stage::Price => "price",
            Stage::Batch => "batch",
        }
    }
}

/// Result of pushing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every requested update was accepted. `echo` is the remote body when
    /// it came back as JSON.
    Succeeded { echo: Option<String> },
    /// Local check failed; nothing was sent for this record.
    Invalid { reason: String },
    /// The remote answered with an error.
    Remote { stage: Stage, detail: String },
    /// The quantity call succeeded but echoed a different quantity.
    Mismatch { body: String },
    /// The call never produced a response.
    Transport { stage: Stage, detail: String },
}

impl Outcome {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Outcome::Invalid {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded { echo: None } => write!(f, "✅ Success"),
            Outcome::Succeeded { echo: Some(body) } => write!(f, "✅ Success: {body}"),
            Outcome::Invalid { reason } => write!(f, "❌ {reason}"),
            Outcome::Remote {
                stage: Stage::Quantity,
                detail,
            } => write!(f, "❌ Qty update failed: {detail}"),
            Outcome::Remote {
                stage: Stage::Price,
                detail,
            } => write!(f, "❌ Price/MRP update failed: {detail}"),
            Outcome::Remote {
                stage: Stage::Batch,
                detail,
            }
            | Outcome::Transport {
                stage: Stage::Batch,
                detail,
            } => write!(f, "❌ {detail}"),
            Outcome::Mismatch { body } => write!(
                f,
                "❌ Inventory not updated as expected. Shopify returned: {body}"
            ),
            Outcome::Transport {
                stage: Stage::Quantity,
                detail,
            } => write!(f, "❌ Exception: {detail}"),
            Outcome::Transport {
                stage: Stage::Price,
                detail,
            } => write!(f, "❌ Price/MRP exception: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordOutcome {
    sku: String,
    outcome: Outcome,
}

/// Outcomes of one submission in input order, one per record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    outcomes: Vec<RecordOutcome>,
}

impl SubmissionReport {
    pub fn push(&mut self, sku: impl Into<String>, outcome: Outcome) {
        self.outcomes.push(RecordOutcome {
            sku: sku.into(),
            outcome,
        });
    }

    /// Records processed, duplicates included.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Distinct SKUs, each with the outcome of its last record.
    fn latest(&self) -> BTreeMap<&str, &Outcome> {
        self.outcomes
            .iter()
            .map(|entry| (entry.sku.as_str(), &entry.outcome))
            .collect()
    }

    pub fn sku_count(&self) -> usize {
        self.latest().len()
    }

    /// SKUs whose last outcome succeeded.
    pub fn succeeded(&self) -> usize {
        self.latest()
            .values()
            .filter(|outcome| outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.sku_count() - self.succeeded()
    }

    /// Projects the report into a fresh status map. A SKU listed twice
    /// keeps its last outcome.
    pub fn status_map(&self) -> StatusMap {
        self.latest()
            .into_iter()
            .map(|(sku, outcome)| (sku.to_string(), outcome.to_string()))
            .collect()
    }
}
