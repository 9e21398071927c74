pub mod flipkart;
mod outcome;
pub mod shopify;

#[cfg(test)]
mod mock;

pub use flipkart::FlipkartSubmitter;
pub use outcome::{Outcome, Stage, StatusMap, SubmissionReport};
pub use shopify::ShopifySubmitter;

use std::time::Duration;

/// Fixed pause between remote calls to stay under marketplace rate limits.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
