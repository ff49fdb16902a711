use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::client::StoreApi;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::{flatten, parse_date, FlatReview, RawReview};
use crate::store::{load_json, save_json, Artifact, DocumentStore};

/// How the remote review list is walked for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// No archive yet: walk every page
    Full,
    /// Archive exists: only reviews strictly newer than `cutoff`
    Incremental { cutoff: NaiveDate },
}

impl FetchMode {
    pub fn cutoff(self) -> Option<NaiveDate> {
        match self {
            FetchMode::Full => None,
            FetchMode::Incremental { cutoff } => Some(cutoff),
        }
    }
}

/// Result of syncing one app's reviews
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub mode: FetchMode,
    pub fetched: usize,
    pub stored: usize,
}

/// Incrementally merges remote reviews into the persisted archive
pub struct ReviewSynchronizer<'a, A: StoreApi, S: DocumentStore> {
    api: &'a A,
    store: &'a S,
    config: &'a SyncConfig,
}

impl<'a, A: StoreApi, S: DocumentStore> ReviewSynchronizer<'a, A, S> {
    pub fn new(api: &'a A, store: &'a S, config: &'a SyncConfig) -> Self {
        Self { api, store, config }
    }

    /// Walk review pages until the token runs out, a page fails, or (with a
    /// cutoff) a page has nothing newer than the cutoff.
    ///
    /// A failed page ends the walk but keeps what was already collected. A
    /// record without a usable `id` or `date` aborts the walk.
    #[instrument(skip(self))]
    pub async fn fetch_reviews(
        &self,
        app_id: &str,
        cutoff: Option<NaiveDate>,
    ) -> Result<Vec<RawReview>, SyncError> {
        let mut collected = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let Some(page) = self.api.review_page(app_id, token.as_deref()).await else {
                debug!(pages, "No data returned, stopping pagination");
                break;
            };
            pages += 1;

            let mut reviews = page
                .reviews
                .into_iter()
                .map(RawReview::from_value)
                .collect::<Result<Vec<_>, _>>()?;
            token = page.next_token;

            if let Some(cutoff) = cutoff {
                reviews = filter_after(reviews, cutoff)?;
                if reviews.is_empty() {
                    debug!(pages, %cutoff, "Page has nothing newer than cutoff");
                    break;
                }
            }

            collected.extend(reviews);

            if token.is_none() {
                break;
            }
        }

        debug!(pages, count = collected.len(), "Pagination finished");

        Ok(collected)
    }

    /// Fetch, flatten, merge with the stored archive and write it back.
    ///
    /// With an existing archive only reviews newer than the configured
    /// number of days before `today` are fetched.
    pub async fn sync_reviews(&self, app_id: &str, today: NaiveDate) -> Result<SyncOutcome> {
        let file_name = Artifact::Reviews.file_name(app_id);
        let existing: Vec<FlatReview> = load_json(self.store, &file_name)?.unwrap_or_default();

        let mode = if existing.is_empty() {
            FetchMode::Full
        } else {
            FetchMode::Incremental {
                cutoff: self.config.cutoff_date(today),
            }
        };

        info!(app_id, existing = existing.len(), ?mode, "Syncing reviews");

        let raw = self
            .fetch_reviews(app_id, mode.cutoff())
            .await
            .with_context(|| format!("Failed to fetch reviews for {}", app_id))?;
        let fetched = raw.len();

        info!(app_id, fetched, "Fetched reviews");

        let fresh = dedupe(flatten_all(&raw));
        let archive = merge(existing, fresh)
            .with_context(|| format!("Failed to merge reviews for {}", app_id))?;

        save_json(self.store, &file_name, &archive)?;

        info!(app_id, stored = archive.len(), "Review archive written");

        Ok(SyncOutcome {
            mode,
            fetched,
            stored: archive.len(),
        })
    }
}

/// Keep reviews dated strictly after `cutoff`
pub fn filter_after(reviews: Vec<RawReview>, cutoff: NaiveDate) -> Result<Vec<RawReview>, SyncError> {
    let mut kept = Vec::with_capacity(reviews.len());
    for review in reviews {
        if review.parsed_date()? > cutoff {
            kept.push(review);
        }
    }
    Ok(kept)
}

pub fn flatten_all(reviews: &[RawReview]) -> Vec<FlatReview> {
    reviews.iter().map(flatten).collect()
}

/// One record per distinct key/value set, first occurrence kept
pub fn dedupe(reviews: Vec<FlatReview>) -> Vec<FlatReview> {
    let mut seen = HashSet::with_capacity(reviews.len());
    reviews
        .into_iter()
        .filter(|review| seen.insert(review.canonical_key()))
        .collect()
}

/// Newest date first, then id descending. Equal keys keep their order.
pub fn sort_archive(reviews: Vec<FlatReview>) -> Result<Vec<FlatReview>, SyncError> {
    let mut keyed = reviews
        .into_iter()
        .map(|review| sort_key(&review).map(|key| (key, review)))
        .collect::<Result<Vec<_>, _>>()?;

    keyed.sort_by(|(a, _), (b, _)| b.cmp(a));

    Ok(keyed.into_iter().map(|(_, review)| review).collect())
}

/// Existing records first, then fresh ones; deduplicated and sorted
pub fn merge(existing: Vec<FlatReview>, fresh: Vec<FlatReview>) -> Result<Vec<FlatReview>, SyncError> {
    let mut combined = existing;
    combined.extend(fresh);
    sort_archive(dedupe(combined))
}

fn sort_key(review: &FlatReview) -> Result<(NaiveDate, String), SyncError> {
    let id = review.id().ok_or(SyncError::MissingField { field: "id" })?;
    let date = review.date().ok_or(SyncError::MissingField { field: "date" })?;
    let date = parse_date(&id, date)?;
    Ok((date, id))
}
