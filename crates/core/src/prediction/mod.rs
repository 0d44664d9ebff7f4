//! Filing location predictions for the open item.

use std::cmp::Ordering;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancellation::OperationSlot;
use crate::http::{endpoints, HttpPipeline, RequestOutcome, RequestResult};
use crate::item::ItemDigest;
use crate::location::{FilingLocation, LocationsResponse};

/// Issues prediction requests. A new request supersedes the pending one.
pub struct PredictionCoordinator {
    pipeline: Arc<HttpPipeline>,
    slot: OperationSlot,
}

impl PredictionCoordinator {
    pub fn new(pipeline: Arc<HttpPipeline>) -> Self {
        Self {
            pipeline,
            slot: OperationSlot::new("prediction"),
        }
    }

    /// Predict locations for `digest` in `cabinet_id`.
    ///
    /// Successful results come back with `filingLocations` sorted by
    /// [`compare_locations`]. Failures are returned unchanged.
    pub async fn load_predictions(&self, cabinet_id: &str, digest: &ItemDigest) -> RequestOutcome {
        let token = self.supersede();
        self.request_predictions(cabinet_id, digest, &token).await
    }

    /// Cancel the pending request and return the token for the next one.
    pub fn supersede(&self) -> CancellationToken {
        self.slot.supersede()
    }

    /// Predict under a token from [`Self::supersede`].
    ///
    /// Callers that publish the result should check `token` again at that point.
    pub async fn request_predictions(
        &self,
        cabinet_id: &str,
        digest: &ItemDigest,
        token: &CancellationToken,
    ) -> RequestOutcome {
        debug!(cabinet = cabinet_id, "Loading predictions");

        let url = endpoints::predictive_search(cabinet_id);
        match self.pipeline.post(&url, digest, Some(token)).await {
            RequestOutcome::Completed(mut result) => {
                if result.is_successful() {
                    sort_result(&mut result);
                }
                RequestOutcome::Completed(result)
            }
            RequestOutcome::Cancelled => RequestOutcome::Cancelled,
        }
    }

    pub fn cancel_pending_requests(&self) {
        self.slot.cancel();
    }
}

/// Locations the item already exists in first, then by relevance, highest first.
pub fn compare_locations(a: &FilingLocation, b: &FilingLocation) -> Ordering {
    b.document_exists
        .cmp(&a.document_exists)
        .then_with(|| b.relevance.total_cmp(&a.relevance))
}

/// Stable sort by [`compare_locations`].
pub fn sort_locations(locations: &mut [FilingLocation]) {
    locations.sort_by(compare_locations);
}

fn sort_result(result: &mut RequestResult) {
    let mut response: LocationsResponse = match result.parse_body() {
        Ok(response) => response,
        Err(e) => {
            warn!(url = result.request_url(), error = %e, "Unexpected prediction response");
            return;
        }
    };
    if response.filing_locations.is_empty() {
        return;
    }

    sort_locations(&mut response.filing_locations);
    match serde_json::to_value(&response) {
        Ok(body) => result.set_body(body),
        Err(e) => warn!(error = %e, "Failed to re-serialize sorted predictions"),
    }
}
