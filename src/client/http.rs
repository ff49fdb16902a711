use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::StoreApi;
use crate::config::ApiConfig;
use crate::models::ReviewPage;

/// HTTP client for the Google Play aggregation API
pub struct PlayApiClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl PlayApiClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
        }
    }

    fn app_url(&self, app_id: &str, suffix: &str) -> String {
        format!("{}/api/apps/{}{}", self.base_url, app_id, suffix)
    }

    /// GET a JSON document; anything but a 200 with a JSON body is `None`
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Option<Value> {
        debug!(url, "Sending request");

        let response = match self.client.get(url).query(query).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Request failed");
                return None;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url, %status, "Unexpected response status");
            return None;
        }

        match response.json().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url, error = %e, "Failed to parse response body");
                None
            }
        }
    }
}

/// A review page body of `null`, `{}` or `[]` carries no data
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[async_trait]
impl StoreApi for PlayApiClient {
    #[instrument(skip(self))]
    async fn review_page(&self, app_id: &str, token: Option<&str>) -> Option<ReviewPage> {
        let url = self.app_url(app_id, "/reviews");
        let mut query = vec![("num", self.page_size.to_string())];
        if let Some(token) = token {
            query.push(("nextPaginationToken", token.to_string()));
        }

        let body = self.get_json(&url, &query).await?;
        if is_empty(&body) {
            debug!(url, "Empty review page body");
            return None;
        }

        match ReviewPage::from_response(body) {
            Ok(page) => {
                debug!(
                    count = page.reviews.len(),
                    has_next = page.next_token.is_some(),
                    "Fetched review page"
                );
                Some(page)
            }
            Err(e) => {
                warn!(error = %e, "Unrecognized review page shape");
                None
            }
        }
    }

    async fn app_info(&self, app_id: &str) -> Option<Value> {
        self.get_json(&self.app_url(app_id, ""), &[]).await
    }

    async fn permissions(&self, app_id: &str) -> Option<Value> {
        self.get_json(&self.app_url(app_id, "/permissions"), &[]).await
    }

    async fn data_safety(&self, app_id: &str) -> Option<Value> {
        self.get_json(&self.app_url(app_id, "/datasafety"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> PlayApiClient {
        PlayApiClient::new(&ApiConfig {
            base_url: server.uri(),
            page_size: 100,
        })
    }

    #[tokio::test]
    async fn test_review_page_follows_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/apps/com.example/reviews"))
            .and(query_param("num", "100"))
            .and(query_param("nextPaginationToken", "tokenA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": {
                    "data": [{"id": "r2", "date": "2024-01-01", "score": 3}]
                }
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/apps/com.example/reviews"))
            .and(query_param("num", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": {
                    "data": [{"id": "r1", "date": "2024-01-02", "score": 5}],
                    "nextPaginationToken": "tokenA"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let first = client.review_page("com.example", None).await.unwrap();
        assert_eq!(first.reviews[0]["id"], json!("r1"));
        assert_eq!(first.next_token.as_deref(), Some("tokenA"));

        let second = client.review_page("com.example", Some("tokenA")).await.unwrap();
        assert_eq!(second.reviews[0]["id"], json!("r2"));
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_non_200_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/apps/com.example/reviews"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/apps/com.example/permissions"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.review_page("com.example", None).await.is_none());
        assert!(client.permissions("com.example").await.is_none());
    }

    #[tokio::test]
    async fn test_opaque_payload_passes_through() {
        let server = MockServer::start().await;
        let info = json!({"title": "Example", "installs": "1,000+", "nested": {"b": 1, "a": 2}});

        Mock::given(method("GET"))
            .and(path("/api/apps/com.example"))
            .respond_with(ResponseTemplate::new(200).set_body_json(info.clone()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/apps/com.example/datasafety"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/apps/com.example/permissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.app_info("com.example").await, Some(info));
        assert_eq!(client.data_safety("com.example").await, Some(json!({})));
        assert_eq!(client.permissions("com.example").await, Some(json!([])));
    }

    #[tokio::test]
    async fn test_empty_review_body_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/apps/com.example/reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.review_page("com.example", None).await.is_none());
    }

    #[tokio::test]
    async fn test_review_page_keeps_unusual_records() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/apps/com.example/reviews"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": {
                    "data": [
                        {"id": "a", "date": "2024-01-03"},
                        {"id": 12345, "date": "2024-01-02"},
                        {"id": "c", "date": null}
                    ],
                    "nextPaginationToken": "tokenA"
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let page = client.review_page("com.example", None).await.unwrap();
        assert_eq!(page.reviews.len(), 3);
        assert_eq!(page.reviews[1]["id"], json!(12345));
        assert_eq!(page.next_token.as_deref(), Some("tokenA"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_none() {
        let client = PlayApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            page_size: 100,
        });
        assert!(client.app_info("com.example").await.is_none());
    }
}
