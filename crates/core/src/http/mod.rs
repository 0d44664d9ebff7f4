//! HTTP pipeline: authenticated requests, token refresh and retry.

mod pipeline;
mod retry;
mod transport;
mod types;

pub use pipeline::HttpPipeline;
pub use retry::{
    is_logging_endpoint, is_retryable_status, RetryDecision, RetryPolicy, RetryState, LOGGING_URL,
    MAX_RETRY_COUNT,
};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::*;

/// Relative endpoint paths below `{scheme}{api_host}/v1`.
pub mod endpoints {
    pub const USER_CABINETS: &str = "/user/cabinets";
    pub const CLIENT_LOGGING: &str = "/clientLogging";

    pub fn predictive_search(cabinet_id: &str) -> String {
        format!("/filingLocations/{}/predictiveSearch", cabinet_id)
    }

    /// `encoded_query` must already be URL-encoded.
    pub fn quick_search(cabinet_id: &str, encoded_query: &str) -> String {
        format!("/filingLocations/{}/quickSearch?query={}", cabinet_id, encoded_query)
    }

    pub fn quick_search_configuration(cabinet_id: &str) -> String {
        format!("/filingLocations/{}/quickSearch/configuration", cabinet_id)
    }
}
