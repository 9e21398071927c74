use crate::inventory::marketplace::Marketplace;
use tracing::trace;

// Trace-based counters; the Prometheus recorder only renders what the
// exporter itself tracks.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "inventory.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn submission_finished(
    marketplace: Marketplace,
    total: usize,
    failed: usize,
    elapsed_ms: u128,
) {
    trace!(
        target = "inventory.metrics",
        marketplace = marketplace.as_str(),
        total = total as u64,
        failed = failed as u64,
        elapsed_ms = elapsed_ms as u64,
        "submission_finished"
    );
}

pub fn remote_call(marketplace: Marketplace, stage: &'static str, status: u16) {
    trace!(
        target = "inventory.metrics",
        marketplace = marketplace.as_str(),
        stage = stage,
        status = status,
        "remote_call"
    );
}
