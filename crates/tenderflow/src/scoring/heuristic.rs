//! Deterministic additive relevance scoring.
//!
//! Five signals, each capped and each contributing an explanation string
//! when it fires. The total is NOT clamped here; callers that need a
//! bounded percentage clamp explicitly (see `assess_manual`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CompanyProfile, MatchScore, TenderScorer, TenderSummary};

const CPV_POINTS_PER_MATCH: i64 = 5;
const CPV_POINTS_CAP: i64 = 10;
const INCLUDE_POINTS_PER_HIT: i64 = 3;
const INCLUDE_POINTS_CAP: i64 = 15;
const EXCLUDE_POINTS_PER_HIT: i64 = 4;
const EXCLUDE_POINTS_CAP: i64 = 12;
const URGENT_DEADLINE_POINTS: i64 = 10;
const NEAR_DEADLINE_POINTS: i64 = 5;
const COUNTRY_MATCH_POINTS: i64 = 8;

/// Additive keyword/CPV/deadline/country scorer. No external calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    /// Scores a tender against a company profile at the given instant.
    ///
    /// Signals are evaluated in a fixed order and reasons are returned in
    /// that order. An invalid or missing deadline contributes 0 points and
    /// never raises.
    pub fn score_at(
        &self,
        tender: &TenderSummary,
        company: &CompanyProfile,
        now: DateTime<Utc>,
    ) -> MatchScore {
        let mut score: i64 = 0;
        let mut reasons = Vec::new();

        let text = format!("{} {}", tender.title, tender.description).to_lowercase();

        // CPV/category overlap.
        let cpv_overlap = tender
            .cpv_codes
            .iter()
            .filter(|code| company.cpv_codes.contains(code))
            .count() as i64;
        if cpv_overlap > 0 {
            let points = (CPV_POINTS_PER_MATCH * cpv_overlap).min(CPV_POINTS_CAP);
            score += points;
            reasons.push(format!(
                "{} CPV code(s) match the company profile (+{})",
                cpv_overlap, points
            ));
        }

        // Included keywords over title + description.
        let include_hits = keyword_hits(&text, &company.keywords_include);
        if include_hits > 0 {
            let points = (INCLUDE_POINTS_PER_HIT * include_hits).min(INCLUDE_POINTS_CAP);
            score += points;
            reasons.push(format!(
                "{} included keyword(s) found in title/description (+{})",
                include_hits, points
            ));
        }

        // Excluded keywords subtract.
        let exclude_hits = keyword_hits(&text, &company.keywords_exclude);
        if exclude_hits > 0 {
            let points = (EXCLUDE_POINTS_PER_HIT * exclude_hits).min(EXCLUDE_POINTS_CAP);
            score -= points;
            reasons.push(format!(
                "{} excluded keyword(s) present (-{})",
                exclude_hits, points
            ));
        }

        // Deadline urgency.
        if let Some(deadline) = tender.deadline {
            let days = (deadline - now).num_days();
            if (0..=14).contains(&days) {
                score += URGENT_DEADLINE_POINTS;
                reasons.push(format!("Deadline within 14 days (+{})", URGENT_DEADLINE_POINTS));
            } else if (15..=30).contains(&days) {
                score += NEAR_DEADLINE_POINTS;
                reasons.push(format!("Deadline within 30 days (+{})", NEAR_DEADLINE_POINTS));
            }
        }

        // Country match.
        if let Some(country) = &tender.country {
            if company.countries.iter().any(|c| c == country) {
                score += COUNTRY_MATCH_POINTS;
                reasons.push(format!(
                    "Tender country {} is a target market (+{})",
                    country, COUNTRY_MATCH_POINTS
                ));
            }
        }

        MatchScore { score, reasons }
    }
}

/// Counts keywords with a case-insensitive substring hit. Each keyword
/// counts at most once regardless of how often it occurs.
fn keyword_hits(lowercased_text: &str, keywords: &[String]) -> i64 {
    keywords
        .iter()
        .filter(|kw| !kw.is_empty() && lowercased_text.contains(kw.to_lowercase().as_str()))
        .count() as i64
}

#[async_trait]
impl TenderScorer for HeuristicScorer {
    async fn score(&self, tender: &TenderSummary, company: &CompanyProfile) -> MatchScore {
        self.score_at(tender, company, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    fn company() -> CompanyProfile {
        CompanyProfile {
            name: "Acme Digital".to_string(),
            keywords_include: vec!["cloud".to_string(), "software".to_string()],
            keywords_exclude: vec![],
            cpv_codes: vec!["72000000".to_string()],
            countries: vec!["UK".to_string()],
            max_deadline_days: 90,
        }
    }

    fn tender() -> TenderSummary {
        TenderSummary {
            title: "Cloud migration programme".to_string(),
            description: "Software delivery for a public authority".to_string(),
            country: Some("UK".to_string()),
            cpv_codes: vec!["72000000".to_string()],
            deadline: Some(now() + Duration::days(10)),
        }
    }

    #[test]
    fn test_reference_score_with_four_signals() {
        // 1 CPV (+5), 2 keywords (+6), deadline in 10 days (+10), country (+8).
        let verdict = HeuristicScorer.score_at(&tender(), &company(), now());

        assert_eq!(verdict.score, 29);
        assert_eq!(verdict.reasons.len(), 4);
        assert!(verdict.reasons[0].contains("CPV"));
        assert!(verdict.reasons[1].contains("included keyword"));
        assert!(verdict.reasons[2].contains("14 days"));
        assert!(verdict.reasons[3].contains("target market"));
    }

    #[test]
    fn test_cpv_points_are_capped() {
        let mut company = company();
        company.cpv_codes = vec![
            "72000000".to_string(),
            "72200000".to_string(),
            "72300000".to_string(),
        ];
        let mut tender = tender();
        tender.cpv_codes = company.cpv_codes.clone();
        tender.deadline = None;
        tender.country = None;
        tender.title = String::new();
        tender.description = String::new();

        let verdict = HeuristicScorer.score_at(&tender, &company, now());
        // 3 overlaps would be 15; cap is 10.
        assert_eq!(verdict.score, 10);
    }

    #[test]
    fn test_include_keyword_points_are_capped() {
        let mut company = company();
        company.keywords_include = (0..6).map(|i| format!("kw{}", i)).collect();
        company.cpv_codes = vec![];
        company.countries = vec![];
        let mut tender = tender();
        tender.title = "kw0 kw1 kw2 kw3 kw4 kw5".to_string();
        tender.description = String::new();
        tender.cpv_codes = vec![];
        tender.country = None;
        tender.deadline = None;

        let verdict = HeuristicScorer.score_at(&tender, &company, now());
        // 6 hits would be 18; cap is 15.
        assert_eq!(verdict.score, 15);
    }

    #[test]
    fn test_excluded_keywords_subtract_and_allow_negative_totals() {
        let mut company = company();
        company.keywords_include = vec![];
        company.keywords_exclude = vec!["construction".to_string(), "cleaning".to_string()];
        company.cpv_codes = vec![];
        company.countries = vec![];
        let mut tender = tender();
        tender.title = "Construction and cleaning services".to_string();
        tender.description = String::new();
        tender.cpv_codes = vec![];
        tender.country = None;
        tender.deadline = None;

        let verdict = HeuristicScorer.score_at(&tender, &company, now());
        assert_eq!(verdict.score, -8);
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.reasons[0].contains("-8"));
    }

    #[test]
    fn test_excluded_keyword_points_are_capped() {
        let mut company = company();
        company.keywords_include = vec![];
        company.keywords_exclude = (0..4).map(|i| format!("bad{}", i)).collect();
        company.cpv_codes = vec![];
        company.countries = vec![];
        let mut tender = tender();
        tender.title = "bad0 bad1 bad2 bad3".to_string();
        tender.description = String::new();
        tender.cpv_codes = vec![];
        tender.country = None;
        tender.deadline = None;

        let verdict = HeuristicScorer.score_at(&tender, &company, now());
        // 4 hits would be 16; cap is 12, subtracted.
        assert_eq!(verdict.score, -12);
    }

    #[test]
    fn test_deadline_bands() {
        let mut t = tender();
        t.cpv_codes = vec![];
        t.country = None;
        t.title = String::new();
        t.description = String::new();
        let c = company();

        t.deadline = Some(now() + Duration::days(14));
        assert_eq!(HeuristicScorer.score_at(&t, &c, now()).score, 10);

        t.deadline = Some(now() + Duration::days(30));
        assert_eq!(HeuristicScorer.score_at(&t, &c, now()).score, 5);

        t.deadline = Some(now() + Duration::days(45));
        assert_eq!(HeuristicScorer.score_at(&t, &c, now()).score, 0);

        // Past deadlines contribute nothing.
        t.deadline = Some(now() - Duration::days(3));
        assert_eq!(HeuristicScorer.score_at(&t, &c, now()).score, 0);
    }

    #[test]
    fn test_missing_deadline_contributes_zero() {
        let mut t = tender();
        t.deadline = None;
        let verdict = HeuristicScorer.score_at(&t, &company(), now());
        // CPV 5 + keywords 6 + country 8; no urgency reason.
        assert_eq!(verdict.score, 19);
        assert_eq!(verdict.reasons.len(), 3);
    }

    #[test]
    fn test_keyword_matching_is_case_insensitive() {
        let mut c = company();
        c.keywords_include = vec!["CLOUD".to_string()];
        c.cpv_codes = vec![];
        c.countries = vec![];
        let mut t = tender();
        t.cpv_codes = vec![];
        t.country = None;
        t.deadline = None;

        let verdict = HeuristicScorer.score_at(&t, &c, now());
        assert_eq!(verdict.score, 3);
    }

    #[test]
    fn test_no_signals_yields_zero_with_no_reasons() {
        let t = TenderSummary::default();
        let verdict = HeuristicScorer.score_at(&t, &CompanyProfile::default(), now());
        assert_eq!(verdict.score, 0);
        assert!(verdict.reasons.is_empty());
    }
}
