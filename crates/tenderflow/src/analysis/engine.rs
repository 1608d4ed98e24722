//! The analysis engine and its generation client.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{
    AnalysisError, AnalysisResult, AnalysisStage, ComplianceItem, ComplianceStatus, Deadline,
    RiskAssessment,
};

/// Input text is truncated to this many characters before prompting.
/// Lossy for very long documents; trailing content is dropped.
pub const MAX_PROMPT_CHARS: usize = 15_000;

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const GENERATION_MODEL: &str = "gpt-4o";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Tender analysis engine.
///
/// Holds an optional generation client; without one (or with demo mode
/// set) every operation serves the deterministic demo result.
pub struct AnalysisEngine {
    client: Option<GenerationClient>,
    demo_mode: bool,
}

impl AnalysisEngine {
    pub fn new(api_key: Option<String>, demo_mode: bool) -> Self {
        let client = api_key
            .filter(|k| !k.is_empty())
            .map(GenerationClient::new);
        if client.is_none() && !demo_mode {
            info!("no generation credential configured, analysis runs in demo mode");
        }
        Self { client, demo_mode }
    }

    /// True when calls are served by the deterministic demo path.
    pub fn is_demo(&self) -> bool {
        self.demo_mode || self.client.is_none()
    }

    /// The client to call out with, or `None` when the demo path applies.
    fn live_client(&self) -> Option<&GenerationClient> {
        if self.demo_mode {
            None
        } else {
            self.client.as_ref()
        }
    }

    /// Full single-shot analysis of extracted tender text.
    pub async fn analyze(
        &self,
        text: &str,
        context: &BTreeMap<String, String>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let Some(client) = self.live_client() else {
            debug!("serving demo analysis");
            return Ok(Self::demo_analysis());
        };

        let system = "You are an expert bid manager. \
            Extract a strict JSON object from the tender document provided. \
            Analyze risks, compliance requirements, and draft a proposal strategy.\n\n\
            Output schema:\n\
            {\n\
              \"compliance_matrix\": [\n\
                { \"requirement\": \"string\", \"source_page\": number (approx), \"status\": \"compliant\" | \"non_compliant\" | \"risk\" }\n\
              ],\n\
              \"risk_score\": number (0-100),\n\
              \"deadlines\": [{ \"label\": \"string\", \"date\": \"YYYY-MM-DD\" }],\n\
              \"proposal_draft\": \"string (markdown)\"\n\
            }";
        let context_json =
            serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string());
        let user = format!(
            "Company context: {}\n\nTender text:\n{}",
            context_json,
            truncate_chars(text, MAX_PROMPT_CHARS)
        );

        let value = client.complete_json(system, &user).await?;
        serde_json::from_value(value)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
    }

    /// Compliance stage: extracts the requirement matrix only.
    pub async fn compliance_stage(
        &self,
        text: &str,
    ) -> Result<Vec<ComplianceItem>, AnalysisError> {
        self.stage_compliance(text)
            .await
            .map_err(|e| stage_error(AnalysisStage::Compliance, e))
    }

    /// Risk stage: scores delivery risk 0-100 with a short rationale.
    pub async fn risk_stage(&self, text: &str) -> Result<RiskAssessment, AnalysisError> {
        self.stage_risk(text)
            .await
            .map_err(|e| stage_error(AnalysisStage::Risk, e))
    }

    /// Proposal stage: drafts the proposal body in markdown.
    pub async fn proposal_stage(&self, text: &str) -> Result<String, AnalysisError> {
        self.stage_proposal(text)
            .await
            .map_err(|e| stage_error(AnalysisStage::Proposal, e))
    }

    async fn stage_compliance(&self, text: &str) -> Result<Vec<ComplianceItem>, AnalysisError> {
        let Some(client) = self.live_client() else {
            return Ok(Self::demo_analysis().compliance_matrix);
        };

        let system = "Extract a compliance matrix from the tender text. Output JSON: \
            { \"requirements\": [{ \"requirement\": \"string\", \"source_page\": number, \
            \"status\": \"compliant\" | \"non_compliant\" | \"risk\" }] }";
        let value = client
            .complete_json(system, &stage_user_prompt(text))
            .await?;
        let items = value
            .get("requirements")
            .cloned()
            .ok_or_else(|| {
                AnalysisError::MalformedResponse("missing 'requirements' field".to_string())
            })?;
        serde_json::from_value(items)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
    }

    async fn stage_risk(&self, text: &str) -> Result<RiskAssessment, AnalysisError> {
        let Some(client) = self.live_client() else {
            let demo = Self::demo_analysis();
            return Ok(RiskAssessment {
                score: demo.risk_score,
                rationale: "Demo risk assessment.".to_string(),
            });
        };

        let system = "Analyze delivery risk for a bidder. Output JSON: \
            { \"score\": number (0-100), \"rationale\": \"string\" }";
        let value = client
            .complete_json(system, &stage_user_prompt(text))
            .await?;
        serde_json::from_value(value)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
    }

    async fn stage_proposal(&self, text: &str) -> Result<String, AnalysisError> {
        let Some(client) = self.live_client() else {
            return Ok(Self::demo_analysis().proposal_draft);
        };

        let system =
            "Draft a proposal responding to the tender. Output JSON: { \"text\": \"markdown string\" }";
        let value = client
            .complete_json(system, &stage_user_prompt(text))
            .await?;
        value
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::MalformedResponse("missing 'text' field".to_string()))
    }

    /// The fixed demo result. Deterministic: identical for every input.
    pub fn demo_analysis() -> AnalysisResult {
        AnalysisResult {
            compliance_matrix: vec![
                ComplianceItem {
                    requirement: "ISO 27001 certification".to_string(),
                    source_page: 4,
                    status: ComplianceStatus::Compliant,
                },
                ComplianceItem {
                    requirement: "Annual turnover above £5M".to_string(),
                    source_page: 8,
                    status: ComplianceStatus::Risk,
                },
                ComplianceItem {
                    requirement: "Social value delivery plan".to_string(),
                    source_page: 12,
                    status: ComplianceStatus::Compliant,
                },
            ],
            risk_score: 85,
            deadlines: vec![Deadline {
                label: "Submission".to_string(),
                date: "2026-05-30".to_string(),
            }],
            proposal_draft: "## Executive Summary\n\nWe are pleased to submit our proposal..."
                .to_string(),
        }
    }
}

fn stage_error(stage: AnalysisStage, source: AnalysisError) -> AnalysisError {
    AnalysisError::Stage {
        stage,
        source: Box::new(source),
    }
}

fn stage_user_prompt(text: &str) -> String {
    format!("Tender text:\n{}", truncate_chars(text, MAX_PROMPT_CHARS))
}

/// Character-boundary-safe prefix.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Minimal chat-completions client expecting JSON-object responses.
pub(crate) struct GenerationClient {
    http: reqwest::Client,
    api_key: String,
}

impl GenerationClient {
    pub(crate) fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Sends a system/user prompt pair and parses the JSON object the
    /// model was instructed to return.
    pub(crate) async fn complete_json(
        &self,
        system: &str,
        user: &str,
    ) -> Result<Value, AnalysisError> {
        let body = json!({
            "model": GENERATION_MODEL,
            "response_format": { "type": "json_object" },
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
        });

        let response = self
            .http
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let content = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                AnalysisError::MalformedResponse("no message content in response".to_string())
            })?;

        let json_str = extract_json(content);
        serde_json::from_str(json_str).map_err(|e| {
            warn!("generation response was not valid JSON: {}", e);
            AnalysisError::MalformedResponse(format!("{}. Content was: {}", e, json_str))
        })
    }
}

/// Extracts the first balanced JSON object from model output, tolerating
/// stray text around it. Tracks string boundaries and escape sequences so
/// braces inside strings don't confuse the depth count.
fn extract_json(response: &str) -> &str {
    let start = match response.find('{') {
        Some(idx) => idx,
        None => return response,
    };

    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut end = response.len();

    for (i, c) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    &response[start..end]
}
