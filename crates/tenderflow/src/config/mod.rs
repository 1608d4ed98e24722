//! Runtime configuration.
//!
//! Everything has a sensible default; deployments override through
//! environment variables. The generation credential doubles as the
//! demo-mode switch: without one, analysis and scoring run offline.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ingest::FeedConfig;
use crate::scoring::{CompanyProfile, HeuristicScorer, LlmScorer, TenderScorer};

/// Default polling cadence for the queue worker (milliseconds).
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Which relevance-scorer implementation ingestion uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Deterministic additive scoring, no external calls.
    Heuristic,
    /// LLM-backed scoring with a neutral fallback on failure.
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. `None` selects the per-user default path.
    pub database_path: Option<PathBuf>,
    /// Directory uploaded PDFs are stored in.
    pub upload_dir: PathBuf,
    /// Credential for the text-generation capability.
    pub generation_api_key: Option<String>,
    /// Forces the deterministic demo analysis even with a credential.
    pub demo_mode: bool,
    /// Queue worker polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Tender listing feeds to ingest.
    pub feeds: Vec<FeedConfig>,
    /// Scorer implementation used inside ingestion.
    pub scoring_mode: ScoringMode,
    /// Profile used for default scoring at ingest time.
    pub reference_profile: CompanyProfile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            upload_dir: PathBuf::from("data/uploads"),
            generation_api_key: None,
            demo_mode: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            feeds: default_feeds(),
            scoring_mode: ScoringMode::Heuristic,
            reference_profile: default_reference_profile(),
        }
    }
}

impl Config {
    /// Builds a configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        config.generation_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        config.demo_mode = std::env::var("AI_DEMO_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if let Ok(path) = std::env::var("TENDERFLOW_DB") {
            config.database_path = Some(PathBuf::from(path));
        }
        if let Ok(dir) = std::env::var("TENDERFLOW_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Ok(ms) = std::env::var("TENDERFLOW_POLL_INTERVAL_MS") {
            if let Ok(parsed) = ms.parse() {
                config.poll_interval_ms = parsed;
            }
        }
        if let Ok(mode) = std::env::var("TENDERFLOW_SCORING_MODE") {
            match mode.as_str() {
                "llm" => config.scoring_mode = ScoringMode::Llm,
                "heuristic" => config.scoring_mode = ScoringMode::Heuristic,
                other => log::warn!("unknown scoring mode '{}', keeping heuristic", other),
            }
        }
        // Comma-separated URL override replaces the default feed set.
        if let Ok(urls) = std::env::var("TENDERFLOW_FEED_URLS") {
            let feeds: Vec<FeedConfig> = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .enumerate()
                .map(|(i, url)| FeedConfig {
                    name: format!("feed-{}", i + 1),
                    url: url.to_string(),
                })
                .collect();
            if !feeds.is_empty() {
                config.feeds = feeds;
            }
        }

        config
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    /// Builds the configured scorer implementation.
    pub fn build_scorer(&self) -> Arc<dyn TenderScorer> {
        match self.scoring_mode {
            ScoringMode::Heuristic => Arc::new(HeuristicScorer),
            ScoringMode::Llm => Arc::new(LlmScorer::new(self.generation_api_key.clone())),
        }
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig {
            name: "TED-EU".to_string(),
            url: "https://ted.europa.eu/en/rss/search?q=sector:services".to_string(),
        },
        FeedConfig {
            name: "UK-ContractsFinder".to_string(),
            url: "https://www.contractsfinder.service.gov.uk/Published/Feed/Atom".to_string(),
        },
    ]
}

/// Generic digital-services profile used when no company is in scope.
fn default_reference_profile() -> CompanyProfile {
    CompanyProfile {
        name: "Reference Company".to_string(),
        keywords_include: vec![
            "software".to_string(),
            "digital".to_string(),
            "platform".to_string(),
            "cloud".to_string(),
            "data".to_string(),
            "cybersecurity".to_string(),
        ],
        keywords_exclude: vec![
            "construction".to_string(),
            "cleaning".to_string(),
            "school meals".to_string(),
        ],
        cpv_codes: vec![],
        countries: vec![],
        max_deadline_days: 90,
    }
}
