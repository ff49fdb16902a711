pub mod http;

pub use http::PlayApiClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::ReviewPage;

/// Read-only view of the app-store aggregation service.
///
/// Every call is attempted once. Transport failures, non-200 responses and
/// empty bodies all come back as `None`; callers treat that as "no data".
#[async_trait]
pub trait StoreApi: Send + Sync {
    /// Fetch one page of reviews, starting after `token` when given
    async fn review_page(&self, app_id: &str, token: Option<&str>) -> Option<ReviewPage>;

    /// Opaque app details
    async fn app_info(&self, app_id: &str) -> Option<Value>;

    /// Opaque permission listing
    async fn permissions(&self, app_id: &str) -> Option<Value>;

    /// Opaque data-safety declaration
    async fn data_safety(&self, app_id: &str) -> Option<Value>;
}
