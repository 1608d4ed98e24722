//! End-to-end tests for feed ingestion and per-company ranking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use tenderflow::db::{tender_repo, Database};
use tenderflow::ingest::{FeedError, FeedItem, FeedSource, TenderIngestor};
use tenderflow::scoring::{rank_tenders, CompanyProfile, HeuristicScorer};

struct StaticFeed {
    name: String,
    items: Vec<FeedItem>,
}

#[async_trait]
impl FeedSource for StaticFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        Ok(self.items.clone())
    }
}

fn feed_item(title: &str, link: &str, description: &str) -> FeedItem {
    FeedItem {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        description: Some(description.to_string()),
        published: Some("Mon, 03 Aug 2026 09:00:00 GMT".to_string()),
        categories: vec![],
    }
}

fn reference_profile() -> CompanyProfile {
    CompanyProfile {
        name: "Reference".to_string(),
        keywords_include: vec!["cloud".to_string(), "software".to_string()],
        keywords_exclude: vec!["construction".to_string()],
        cpv_codes: vec![],
        countries: vec![],
        max_deadline_days: 90,
    }
}

#[tokio::test]
async fn ingested_tenders_are_ranked_per_viewing_company() {
    let db = Database::open_in_memory().unwrap();
    let feed: Arc<dyn FeedSource> = Arc::new(StaticFeed {
        name: "TED-EU".to_string(),
        items: vec![
            feed_item(
                "Cloud software platform",
                "https://example.org/cloud",
                "Managed cloud software for a ministry",
            ),
            feed_item(
                "Road construction works",
                "https://example.org/roads",
                "Motorway construction and maintenance",
            ),
        ],
    });

    let ingestor = TenderIngestor::new(
        db.clone(),
        vec![feed],
        Arc::new(HeuristicScorer),
        reference_profile(),
    );
    let stats = ingestor.ingest().await;
    assert_eq!(stats.created, 2);
    assert_eq!(stats.errors, 0);

    // A company that *wants* construction sees the opposite ordering of
    // the ingest-time default.
    let construction_company = CompanyProfile {
        name: "RoadWorks Ltd".to_string(),
        keywords_include: vec!["construction".to_string(), "motorway".to_string()],
        keywords_exclude: vec!["cloud".to_string()],
        cpv_codes: vec![],
        countries: vec![],
        max_deadline_days: 90,
    };

    let rows = tender_repo::list_recent(&db, 10).unwrap();
    let ranked = rank_tenders(rows, &construction_company, Utc::now());

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].tender.url, "https://example.org/roads");
    assert!(ranked[0].score > ranked[1].score);
    assert!(ranked[0]
        .matched_reasons
        .iter()
        .any(|r| r.contains("included keyword")));

    // The ingest-time default scored the cloud tender higher.
    let cloud_row = tender_repo::find_by_url(&db, "https://example.org/cloud")
        .unwrap()
        .unwrap();
    let roads_row = tender_repo::find_by_url(&db, "https://example.org/roads")
        .unwrap()
        .unwrap();
    assert!(cloud_row.relevance_score > roads_row.relevance_score);
}

#[tokio::test]
async fn re_running_ingestion_is_idempotent_per_url() {
    let db = Database::open_in_memory().unwrap();
    let feed: Arc<dyn FeedSource> = Arc::new(StaticFeed {
        name: "TED-EU".to_string(),
        items: vec![feed_item(
            "Cloud software platform",
            "https://example.org/cloud",
            "Managed cloud software",
        )],
    });

    let ingestor = TenderIngestor::new(
        db.clone(),
        vec![feed],
        Arc::new(HeuristicScorer),
        reference_profile(),
    );

    let first = ingestor.ingest().await;
    let second = ingestor.ingest().await;

    assert_eq!(first.created, 1);
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(tender_repo::count(&db).unwrap(), 1);
}
