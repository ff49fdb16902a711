use std::collections::BTreeMap;

use anyhow::Result;
use tracing::info;

use crate::models::FlatReview;
use crate::store::{load_json, save_json, Artifact, DocumentStore};

/// Count how many reviews carry each criterion key starting with `prefix`
pub fn count_criteria(reviews: &[FlatReview], prefix: &str) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for review in reviews {
        for key in review.keys().filter(|k| k.starts_with(prefix)) {
            *counts.entry(key.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Recompute the criteria counts from the stored review archive
pub fn save_criteria_counts(
    store: &impl DocumentStore,
    app_id: &str,
    prefix: &str,
) -> Result<BTreeMap<String, u64>> {
    let reviews: Vec<FlatReview> =
        load_json(store, &Artifact::Reviews.file_name(app_id))?.unwrap_or_default();

    let counts = count_criteria(&reviews, prefix);
    save_json(store, &Artifact::Criteria.file_name(app_id), &counts)?;

    info!(app_id, criteria = counts.len(), "Criteria counts written");

    Ok(counts)
}
