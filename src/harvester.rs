use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::StoreApi;
use crate::config::Config;
use crate::criteria::save_criteria_counts;
use crate::store::{save_json, Artifact, DocumentStore};
use crate::sync::{ReviewSynchronizer, SyncOutcome};

/// What one app's harvest produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSummary {
    pub app_id: String,
    pub reviews: SyncOutcome,
    pub criteria: usize,
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub apps: Vec<AppSummary>,
}

impl HarvestSummary {
    pub fn total_reviews(&self) -> usize {
        self.apps.iter().map(|a| a.reviews.stored).sum()
    }
}

/// Runs the per-app harvest steps in a fixed order, one app at a time
pub struct Harvester<A: StoreApi, S: DocumentStore> {
    api: A,
    store: S,
    config: Config,
}

impl<A: StoreApi, S: DocumentStore> Harvester<A, S> {
    pub fn new(api: A, store: S, config: Config) -> Self {
        Self { api, store, config }
    }

    /// Harvest every app in order; a fatal error stops the whole batch
    pub async fn run(&self, app_ids: &[String], today: NaiveDate) -> Result<HarvestSummary> {
        info!(apps = app_ids.len(), %today, "Starting harvest");

        let mut summary = HarvestSummary::default();
        for app_id in app_ids {
            summary.apps.push(self.harvest_app(app_id, today).await?);
        }

        info!(
            apps = summary.apps.len(),
            reviews = summary.total_reviews(),
            "Harvest complete"
        );

        Ok(summary)
    }

    /// info, reviews, criteria counts, permissions, data safety
    pub async fn harvest_app(&self, app_id: &str, today: NaiveDate) -> Result<AppSummary> {
        info!(app_id, "Harvesting app");

        self.save_app_info(app_id).await?;
        let reviews = self.save_reviews(app_id, today).await?;
        let criteria = self.save_criteria(app_id)?;
        self.save_permissions(app_id).await?;
        self.save_data_safety(app_id).await?;

        Ok(AppSummary {
            app_id: app_id.to_string(),
            reviews,
            criteria,
        })
    }

    pub async fn save_app_info(&self, app_id: &str) -> Result<()> {
        let payload = self.api.app_info(app_id).await;
        self.save_payload(Artifact::AppInfo, app_id, payload)
    }

    pub async fn save_reviews(&self, app_id: &str, today: NaiveDate) -> Result<SyncOutcome> {
        ReviewSynchronizer::new(&self.api, &self.store, &self.config.sync)
            .sync_reviews(app_id, today)
            .await
    }

    /// Returns the number of distinct criteria counted
    pub fn save_criteria(&self, app_id: &str) -> Result<usize> {
        let counts = save_criteria_counts(&self.store, app_id, &self.config.sync.criteria_prefix)?;
        Ok(counts.len())
    }

    pub async fn save_permissions(&self, app_id: &str) -> Result<()> {
        let payload = self.api.permissions(app_id).await;
        self.save_payload(Artifact::Permissions, app_id, payload)
    }

    pub async fn save_data_safety(&self, app_id: &str) -> Result<()> {
        let payload = self.api.data_safety(app_id).await;
        self.save_payload(Artifact::DataSafety, app_id, payload)
    }

    /// Overwrite the artifact verbatim; no data is written as `null`
    fn save_payload(&self, artifact: Artifact, app_id: &str, payload: Option<Value>) -> Result<()> {
        if payload.is_none() {
            warn!(app_id, ?artifact, "No data returned, writing null");
        }
        save_json(&self.store, &artifact.file_name(app_id), &payload)
    }

    /// Get the store for direct access
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Read the JSON array of app identifiers that drives a run
pub fn load_app_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read app list: {}", path.display()))?;

    let app_ids: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse app list: {}", path.display()))?;

    info!(path = %path.display(), count = app_ids.len(), "Loaded app list");

    Ok(app_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewPage;
    use crate::store::MemoryStore;
    use crate::sync::FetchMode;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;

    /// Single review page and fixed opaque payloads; no failures
    struct FixedApi {
        info: Option<Value>,
        permissions: Option<Value>,
        reviews: Vec<Value>,
    }

    #[async_trait]
    impl StoreApi for FixedApi {
        async fn review_page(&self, _app_id: &str, _token: Option<&str>) -> Option<ReviewPage> {
            Some(ReviewPage {
                reviews: self.reviews.clone(),
                next_token: None,
            })
        }

        async fn app_info(&self, _app_id: &str) -> Option<Value> {
            self.info.clone()
        }

        async fn permissions(&self, _app_id: &str) -> Option<Value> {
            self.permissions.clone()
        }

        async fn data_safety(&self, _app_id: &str) -> Option<Value> {
            None
        }
    }

    fn api() -> FixedApi {
        let reviews = vec![
            json!({
                "id": "r1", "date": "2024-01-05", "score": 5, "scoreText": "5",
                "title": null, "text": "great",
                "criterias": [{"criteria": "vaf_clarity", "rating": 1}]
            }),
            json!({
                "id": "r2", "date": "2024-01-06", "score": 1, "scoreText": "1",
                "title": null, "text": "bad",
                "criterias": [{"criteria": "vaf_clarity", "rating": 2}, {"criteria": "vaf_speed", "rating": 1}]
            }),
        ];

        FixedApi {
            info: Some(json!({"title": "Example"})),
            permissions: Some(json!([{"type": "Location", "permission": "precise location"}])),
            reviews,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[tokio::test]
    async fn test_harvest_app_writes_all_artifacts() {
        let harvester = Harvester::new(api(), MemoryStore::new(), Config::default());

        let summary = harvester.harvest_app("com.example", today()).await.unwrap();

        assert_eq!(summary.reviews.mode, FetchMode::Full);
        assert_eq!(summary.reviews.stored, 2);
        assert_eq!(summary.criteria, 2);
        assert_eq!(
            harvester.store().names().unwrap(),
            [
                "AppInfo_com.example.json",
                "Criterias_com.example.json",
                "DataSafety_com.example.json",
                "Permissions_com.example.json",
                "Reviews_com.example.json",
            ]
        );

        let store = harvester.store();
        assert_eq!(
            store.read("AppInfo_com.example.json").unwrap().as_deref(),
            Some("{\n    \"title\": \"Example\"\n}")
        );
        assert_eq!(
            store.read("DataSafety_com.example.json").unwrap().as_deref(),
            Some("null")
        );
        assert_eq!(
            store.read("Criterias_com.example.json").unwrap().as_deref(),
            Some("{\n    \"vaf_clarity\": 2,\n    \"vaf_speed\": 1\n}")
        );
    }

    #[tokio::test]
    async fn test_failed_info_writes_null() {
        let mut api = api();
        api.info = None;
        let harvester = Harvester::new(api, MemoryStore::new(), Config::default());

        harvester.save_app_info("com.example").await.unwrap();

        assert_eq!(
            harvester.store().read("AppInfo_com.example.json").unwrap().as_deref(),
            Some("null")
        );
    }

    #[tokio::test]
    async fn test_empty_permissions_written_verbatim() {
        let mut api = api();
        api.permissions = Some(json!([]));
        let harvester = Harvester::new(api, MemoryStore::new(), Config::default());

        harvester.save_permissions("com.example").await.unwrap();

        assert_eq!(
            harvester.store().read("Permissions_com.example.json").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_run_processes_apps_in_order() {
        let harvester = Harvester::new(api(), MemoryStore::new(), Config::default());
        let apps = vec!["a".to_string(), "b".to_string()];

        let summary = harvester.run(&apps, today()).await.unwrap();

        let order: Vec<&str> = summary.apps.iter().map(|a| a.app_id.as_str()).collect();
        assert_eq!(order, ["a", "b"]);
        assert_eq!(summary.total_reviews(), 4);
    }

    #[tokio::test]
    async fn test_second_run_is_incremental() {
        let harvester = Harvester::new(api(), MemoryStore::new(), Config::default());
        let apps = vec!["a".to_string()];

        harvester.run(&apps, today()).await.unwrap();
        let first = harvester.store().read("Reviews_a.json").unwrap();

        // cutoff 2024-01-08: the fixed page has nothing newer
        let summary = harvester.run(&apps, today()).await.unwrap();
        assert_eq!(summary.apps[0].reviews.fetched, 0);
        assert_eq!(
            summary.apps[0].reviews.mode,
            FetchMode::Incremental {
                cutoff: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
            }
        );
        assert_eq!(harvester.store().read("Reviews_a.json").unwrap(), first);
    }

    #[test]
    fn test_load_app_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("applist.json");
        fs::write(&path, r#"["com.a", "com.b"]"#).unwrap();

        let apps = load_app_list(&path).unwrap();
        assert_eq!(apps, ["com.a", "com.b"]);

        assert!(load_app_list(dir.path().join("missing.json")).is_err());
    }
}
