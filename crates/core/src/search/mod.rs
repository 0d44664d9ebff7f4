//! Quick search for filing locations.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancellation::OperationSlot;
use crate::http::{endpoints, HttpPipeline, RequestOutcome, RequestResult};
use crate::location::{FilingLocation, LocationType, LocationsResponse, SearchConfiguration};

/// Issues quick searches and drops location types the cabinet excludes.
///
/// Exclusion lists are fetched once per cabinet and kept for the lifetime of
/// the coordinator. Failed configuration fetches are not cached.
pub struct SearchCoordinator {
    pipeline: Arc<HttpPipeline>,
    slot: OperationSlot,
    excluded_types: RwLock<HashMap<String, Vec<LocationType>>>,
}

impl SearchCoordinator {
    pub fn new(pipeline: Arc<HttpPipeline>) -> Self {
        Self {
            pipeline,
            slot: OperationSlot::new("quick_search"),
            excluded_types: RwLock::new(HashMap::new()),
        }
    }

    /// Search `cabinet_id` for `query_text`. A new search supersedes the pending one.
    pub async fn search(&self, cabinet_id: &str, query_text: &str) -> RequestOutcome {
        let token = self.supersede();
        self.search_with(cabinet_id, query_text, &token).await
    }

    /// Cancel the pending search and return the token for the next one.
    pub fn supersede(&self) -> CancellationToken {
        self.slot.supersede()
    }

    /// Search under a token from [`Self::supersede`].
    pub async fn search_with(
        &self,
        cabinet_id: &str,
        query_text: &str,
        token: &CancellationToken,
    ) -> RequestOutcome {
        debug!(cabinet = cabinet_id, query = query_text, "Quick search");

        let url = endpoints::quick_search(cabinet_id, &fixed_encode_uri_component(query_text));
        let mut result = match self.pipeline.get(&url, Some(token)).await {
            RequestOutcome::Completed(result) => result,
            RequestOutcome::Cancelled => return RequestOutcome::Cancelled,
        };
        if !result.is_successful() {
            return RequestOutcome::Completed(result);
        }

        let response: LocationsResponse = match result.parse_body() {
            Ok(response) => response,
            Err(e) => {
                warn!(url = result.request_url(), error = %e, "Unexpected search response");
                return RequestOutcome::Completed(result);
            }
        };
        if response.filing_locations.is_empty() {
            return RequestOutcome::Completed(result);
        }

        let Some(excluded) = self.excluded_types(cabinet_id, token).await else {
            return RequestOutcome::Cancelled;
        };
        apply_filter(&mut result, response, &excluded);
        RequestOutcome::Completed(result)
    }

    pub fn cancel_pending_requests(&self) {
        self.slot.cancel();
    }

    /// Cached exclusion list, fetching it on a miss. `None` when the fetch was cancelled.
    async fn excluded_types(
        &self,
        cabinet_id: &str,
        token: &CancellationToken,
    ) -> Option<Vec<LocationType>> {
        if let Some(cached) = self.excluded_types.read().await.get(cabinet_id) {
            return Some(cached.clone());
        }

        let url = endpoints::quick_search_configuration(cabinet_id);
        let result = self.pipeline.get(&url, Some(token)).await.into_result()?;
        if !result.is_successful() {
            warn!(
                cabinet = cabinet_id,
                status = result.status_code(),
                "Search configuration unavailable, not filtering"
            );
            return Some(Vec::new());
        }

        match result.parse_body::<SearchConfiguration>() {
            Ok(configuration) => {
                let excluded = configuration.excluded_types();
                self.excluded_types
                    .write()
                    .await
                    .insert(cabinet_id.to_string(), excluded.clone());
                Some(excluded)
            }
            Err(e) => {
                warn!(cabinet = cabinet_id, error = %e, "Invalid search configuration");
                Some(Vec::new())
            }
        }
    }
}

/// Percent-encode everything except `A-Z a-z 0-9 - _ . ~`.
///
/// Unlike plain URI component encoding this also escapes `! ' ( ) *`.
pub fn fixed_encode_uri_component(text: &str) -> String {
    urlencoding::encode(text).into_owned()
}

/// Drop locations whose type is in `excluded`.
pub fn filter_locations(
    locations: Vec<FilingLocation>,
    excluded: &[LocationType],
) -> Vec<FilingLocation> {
    locations
        .into_iter()
        .filter(|l| !excluded.contains(&l.location.location_type))
        .collect()
}

fn apply_filter(result: &mut RequestResult, mut response: LocationsResponse, excluded: &[LocationType]) {
    if excluded.is_empty() {
        return;
    }
    let before = response.filing_locations.len();
    response.filing_locations = filter_locations(response.filing_locations, excluded);
    debug!(
        removed = before - response.filing_locations.len(),
        "Filtered search results"
    );

    match serde_json::to_value(&response) {
        Ok(body) => result.set_body(body),
        Err(e) => warn!(error = %e, "Failed to re-serialize filtered search results"),
    }
}
