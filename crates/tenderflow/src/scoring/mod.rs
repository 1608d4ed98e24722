//! Tender relevance scoring.
//!
//! Two interchangeable scorer implementations behind one trait: a
//! deterministic additive heuristic (the listing/ranking path and the
//! offline substitute) and an LLM-backed scorer. Selection is a
//! configuration concern so ingestion throughput is never coupled to
//! external-call latency in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::tender_repo::TenderRow;

pub mod heuristic;
pub mod llm;

pub use heuristic::HeuristicScorer;
pub use llm::{LlmScorer, NEUTRAL_FALLBACK_SCORE};

/// Company profile used as scoring input. Owned by the account layer;
/// this module only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub keywords_include: Vec<String>,
    pub keywords_exclude: Vec<String>,
    pub cpv_codes: Vec<String>,
    pub countries: Vec<String>,
    /// Maximum deadline window (days) the company will consider.
    pub max_deadline_days: i64,
}

/// The tender fields relevant to scoring, detached from storage.
#[derive(Debug, Clone, Default)]
pub struct TenderSummary {
    pub title: String,
    pub description: String,
    pub country: Option<String>,
    pub cpv_codes: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
}

impl TenderSummary {
    /// Builds a scoring view from a stored tender row.
    pub fn from_row(row: &TenderRow) -> Self {
        let deadline = row
            .deadline
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Self {
            title: row.title.clone(),
            description: row.description_raw.clone(),
            country: row.country.clone(),
            cpv_codes: row.cpv_code_list(),
            deadline,
        }
    }
}

/// A relevance verdict: bounded-ish score plus ordered explanations, each
/// annotated with its point delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: i64,
    pub reasons: Vec<String>,
}

/// Scoring capability. Implementations must never fail: the LLM variant
/// degrades to a neutral fallback internally because it runs inside bulk
/// ingestion loops.
#[async_trait]
pub trait TenderScorer: Send + Sync {
    async fn score(&self, tender: &TenderSummary, company: &CompanyProfile) -> MatchScore;
}

/// Bid complexity bucket for manual assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Refines a base score with manual assessment inputs and clamps the
/// result to a displayable percentage.
pub fn assess_manual(base: MatchScore, complexity: Complexity, competitors: u32) -> MatchScore {
    let mut score = base.score;
    let mut reasons = base.reasons;

    if complexity == Complexity::High {
        score -= 10;
        reasons.push(
            "High complexity reduces win probability without niche expertise (-10)".to_string(),
        );
    }
    if competitors > 5 {
        score -= 15;
        reasons.push(format!(
            "Crowded field of {} competitors reduces statistical win chance (-15)",
            competitors
        ));
    }

    MatchScore {
        score: score.clamp(0, 99),
        reasons,
    }
}

/// A tender paired with its per-company relevance verdict.
#[derive(Debug, Clone)]
pub struct RankedTender {
    pub tender: TenderRow,
    pub score: i64,
    pub matched_reasons: Vec<String>,
}

/// Re-scores tenders for the viewing company and sorts by relevance.
///
/// The score persisted at ingest time is only a default; listings always
/// recompute against the caller's profile.
pub fn rank_tenders(
    rows: Vec<TenderRow>,
    company: &CompanyProfile,
    now: DateTime<Utc>,
) -> Vec<RankedTender> {
    let scorer = HeuristicScorer;
    let mut ranked: Vec<RankedTender> = rows
        .into_iter()
        .map(|row| {
            let verdict = scorer.score_at(&TenderSummary::from_row(&row), company, now);
            RankedTender {
                tender: row,
                score: verdict.score,
                matched_reasons: verdict.reasons,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(score: i64) -> MatchScore {
        MatchScore {
            score,
            reasons: vec!["base".to_string()],
        }
    }

    #[test]
    fn test_assess_manual_high_complexity_penalty() {
        let result = assess_manual(base(50), Complexity::High, 0);
        assert_eq!(result.score, 40);
        assert_eq!(result.reasons.len(), 2);
    }

    #[test]
    fn test_assess_manual_competitor_penalty() {
        let result = assess_manual(base(50), Complexity::Low, 6);
        assert_eq!(result.score, 35);

        // Five competitors is not "crowded" yet.
        let result = assess_manual(base(50), Complexity::Low, 5);
        assert_eq!(result.score, 50);
    }

    #[test]
    fn test_assess_manual_clamps_to_display_range() {
        assert_eq!(assess_manual(base(120), Complexity::Low, 0).score, 99);
        assert_eq!(assess_manual(base(3), Complexity::High, 9).score, 0);
    }

    #[test]
    fn test_tender_summary_from_row_parses_deadline() {
        let row = TenderRow {
            id: "t1".to_string(),
            source: "TED-EU".to_string(),
            url: "https://example.org/1".to_string(),
            title: "Title".to_string(),
            description_raw: "Desc".to_string(),
            short_description: "Desc".to_string(),
            authority: None,
            country: Some("UK".to_string()),
            cpv_codes: r#"["72000000"]"#.to_string(),
            budget: None,
            deadline: Some("2026-09-05T00:00:00Z".to_string()),
            published_at: None,
            relevance_score: 0,
            matched_reasons: "[]".to_string(),
            created_at: "2026-08-01T00:00:00Z".to_string(),
            updated_at: "2026-08-01T00:00:00Z".to_string(),
        };

        let summary = TenderSummary::from_row(&row);
        assert!(summary.deadline.is_some());
        assert_eq!(summary.cpv_codes, vec!["72000000".to_string()]);

        let mut broken = row;
        broken.deadline = Some("not a date".to_string());
        assert!(TenderSummary::from_row(&broken).deadline.is_none());
    }
}
