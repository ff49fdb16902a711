pub mod client;
pub mod config;
pub mod criteria;
pub mod error;
pub mod harvester;
pub mod models;
pub mod store;
pub mod sync;

pub use client::{PlayApiClient, StoreApi};
pub use config::Config;
pub use criteria::{count_criteria, save_criteria_counts};
pub use error::SyncError;
pub use harvester::{load_app_list, AppSummary, HarvestSummary, Harvester};
pub use models::*;
pub use store::{Artifact, DirStore, DocumentStore, MemoryStore};
pub use sync::{dedupe, merge, sort_archive, FetchMode, ReviewSynchronizer, SyncOutcome};
