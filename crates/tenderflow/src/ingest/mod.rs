//! Tender feed ingestion.
//!
//! Pulls external listings, normalizes fields, scores each entry against
//! the reference profile, and upserts by source URL. Per-feed and per-item
//! failures are counted and logged; one bad feed must not abort the rest
//! of the run.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::db::tender_repo::{self, TenderRow, Upserted};
use crate::db::{Database, DatabaseError};
use crate::scoring::{CompanyProfile, TenderScorer, TenderSummary};

pub mod feed;
pub mod normalize;

pub use feed::{FeedError, FeedItem, FeedSource, HttpFeed};

/// Per-feed item cap, keeping a single run bounded.
pub const FEED_ITEM_LIMIT: usize = 50;

/// A configured feed endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    pub errors: u64,
}

/// Why a single item was skipped.
#[derive(Error, Debug)]
enum ItemError {
    #[error("feed item has no link to key on")]
    MissingKey,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Feed-to-database ingestion pipeline.
pub struct TenderIngestor {
    db: Database,
    feeds: Vec<Arc<dyn FeedSource>>,
    scorer: Arc<dyn TenderScorer>,
    profile: CompanyProfile,
}

impl TenderIngestor {
    pub fn new(
        db: Database,
        feeds: Vec<Arc<dyn FeedSource>>,
        scorer: Arc<dyn TenderScorer>,
        profile: CompanyProfile,
    ) -> Self {
        Self {
            db,
            feeds,
            scorer,
            profile,
        }
    }

    /// Builds an ingestor with HTTP feeds from configuration.
    pub fn from_feed_configs(
        db: Database,
        configs: &[FeedConfig],
        scorer: Arc<dyn TenderScorer>,
        profile: CompanyProfile,
    ) -> Self {
        let feeds = configs
            .iter()
            .map(|c| Arc::new(HttpFeed::new(c.name.clone(), c.url.clone())) as Arc<dyn FeedSource>)
            .collect();
        Self::new(db, feeds, scorer, profile)
    }

    /// Runs one full ingestion pass over all configured feeds.
    ///
    /// Never returns an error; failures are tallied in the returned stats.
    pub async fn ingest(&self) -> IngestStats {
        let mut stats = IngestStats::default();

        for feed in &self.feeds {
            let span = info_span!("ingest_feed", feed = %feed.name());
            self.ingest_feed(feed.as_ref(), &mut stats)
                .instrument(span)
                .await;
        }

        info!(
            processed = stats.processed,
            created = stats.created,
            updated = stats.updated,
            errors = stats.errors,
            "ingestion finished"
        );
        stats
    }

    /// Fetches and processes one feed, tallying into `stats`.
    async fn ingest_feed(&self, feed: &dyn FeedSource, stats: &mut IngestStats) {
        let items = match feed.fetch().await {
            Ok(items) => items,
            Err(e) => {
                error!(feed = %feed.name(), "feed fetch failed: {}", e);
                stats.errors += 1;
                return;
            }
        };

        for item in items.into_iter().take(FEED_ITEM_LIMIT) {
            stats.processed += 1;
            match self.process_item(feed.name(), item).await {
                Ok(Upserted::Created) => stats.created += 1,
                Ok(Upserted::Updated) => stats.updated += 1,
                Err(e) => {
                    error!(feed = %feed.name(), "item skipped: {}", e);
                    stats.errors += 1;
                }
            }
        }
    }

    async fn process_item(&self, source: &str, item: FeedItem) -> Result<Upserted, ItemError> {
        // Source URL is the upsert key; entries without one are unusable.
        let url = item
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(ItemError::MissingKey)?
            .to_string();

        let now = Utc::now();
        let title = normalize::normalize_title(item.title.as_deref());
        let description = item.description.unwrap_or_default();
        let country = normalize::detect_country(source, &title, &description);
        let budget = normalize::extract_budget(&description);
        let published_at = normalize::parse_published(item.published.as_deref()).unwrap_or(now);
        let deadline = normalize::placeholder_deadline(now);

        let summary = TenderSummary {
            title: title.clone(),
            description: description.clone(),
            country: Some(country.clone()),
            cpv_codes: item.categories.clone(),
            deadline: Some(deadline),
        };
        // Default score persisted at ingest time; listings re-score per
        // viewing company.
        let verdict = self.scorer.score(&summary, &self.profile).await;

        let row = TenderRow {
            id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            url,
            title,
            short_description: normalize::short_description(&description),
            description_raw: description,
            authority: Some("Public Authority".to_string()),
            country: Some(country),
            cpv_codes: serde_json::to_string(&item.categories).unwrap_or_else(|_| "[]".into()),
            budget,
            deadline: Some(deadline.to_rfc3339()),
            published_at: Some(published_at.to_rfc3339()),
            relevance_score: verdict.score,
            matched_reasons: serde_json::to_string(&verdict.reasons)
                .unwrap_or_else(|_| "[]".into()),
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };

        Ok(tender_repo::upsert(&self.db, &row)?)
    }
}
