//! LLM-backed relevance scoring.
//!
//! Wraps the generation client and degrades to a neutral score on any
//! failure (missing credential, timeout, malformed JSON). This boundary
//! must never throw: it runs inside bulk ingestion loops where one flaky
//! call must not poison the batch.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::analysis::engine::GenerationClient;
use crate::analysis::AnalysisError;

use super::{CompanyProfile, MatchScore, TenderScorer, TenderSummary};

/// Score returned when the LLM call fails for any reason.
pub const NEUTRAL_FALLBACK_SCORE: i64 = 60;

/// Scorer that prompts a text-generation capability for `{score, rationale}`.
pub struct LlmScorer {
    client: Option<GenerationClient>,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: i64,
    #[serde(default)]
    rationale: String,
}

impl LlmScorer {
    pub fn new(api_key: Option<String>) -> Self {
        let client = api_key
            .filter(|k| !k.is_empty())
            .map(GenerationClient::new);
        Self { client }
    }

    async fn request_score(
        &self,
        tender: &TenderSummary,
        company: &CompanyProfile,
    ) -> Result<MatchScore, AnalysisError> {
        let client = self.client.as_ref().ok_or_else(|| {
            AnalysisError::Request("no generation credential configured".to_string())
        })?;

        let system = "You are a precise scoring engine.";
        let user = format!(
            "You are an expert bid manager. Evaluate the fit of this tender for the company.\n\n\
             TENDER:\n\
             Title: {}\n\
             Description: {}\n\
             Region: {}\n\n\
             COMPANY:\n\
             Name: {}\n\
             Keywords include: {}\n\
             Keywords exclude: {}\n\
             CPV codes: {}\n\n\
             TASK:\n\
             1. Analyze the match based on capabilities, keywords, and region.\n\
             2. Assign a score from 0 to 100 (0 = irrelevant, 100 = perfect fit).\n\
             3. Provide a 1-sentence rationale.\n\n\
             Return JSON:\n{{\n  \"score\": number,\n  \"rationale\": \"string\"\n}}",
            tender.title,
            tender.description,
            tender.country.as_deref().unwrap_or("Unknown"),
            company.name,
            company.keywords_include.join(", "),
            company.keywords_exclude.join(", "),
            company.cpv_codes.join(", "),
        );

        let value = client.complete_json(system, &user).await?;
        let parsed: ScoreResponse = serde_json::from_value(value)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        Ok(MatchScore {
            score: parsed.score,
            reasons: vec![if parsed.rationale.is_empty() {
                "Analysis completed.".to_string()
            } else {
                parsed.rationale
            }],
        })
    }
}

#[async_trait]
impl TenderScorer for LlmScorer {
    async fn score(&self, tender: &TenderSummary, company: &CompanyProfile) -> MatchScore {
        match self.request_score(tender, company).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("relevance scoring failed, using neutral fallback: {}", e);
                MatchScore {
                    score: NEUTRAL_FALLBACK_SCORE,
                    reasons: vec![
                        "Automated relevance analysis failed; defaulting to neutral score."
                            .to_string(),
                    ],
                }
            }
        }
    }
}
