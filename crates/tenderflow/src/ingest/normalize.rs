//! Field normalization for raw feed entries.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

/// Maximum length of the derived short description.
const SHORT_DESCRIPTION_CHARS: usize = 250;

/// Placeholder deadline offset when the source omits one.
const PLACEHOLDER_DEADLINE_DAYS: i64 = 30;

/// Currency-amount pattern for best-effort budget extraction.
fn budget_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[€£$]\s?[\d,]+(\.\d{2})?").expect("valid budget pattern"))
}

/// Trimmed title with a fallback for unnamed entries.
pub fn normalize_title(raw: Option<&str>) -> String {
    let trimmed = raw.unwrap_or("").trim();
    if trimmed.is_empty() {
        "Untitled Tender".to_string()
    } else {
        trimmed.to_string()
    }
}

/// First 250 characters of the description, ellipsized when truncated.
pub fn short_description(raw: &str) -> String {
    let total = raw.chars().count();
    if total <= SHORT_DESCRIPTION_CHARS {
        return raw.to_string();
    }
    let prefix: String = raw.chars().take(SHORT_DESCRIPTION_CHARS).collect();
    format!("{}...", prefix)
}

/// Best-effort budget extraction: the first currency amount in the text.
pub fn extract_budget(text: &str) -> Option<String> {
    budget_regex().find(text).map(|m| m.as_str().to_string())
}

/// Keyword-based country bucket. Defaults to "EU" for TED-style sources.
pub fn detect_country(source: &str, title: &str, description: &str) -> String {
    let combined = format!("{} {}", title, description);
    if source.contains("UK") || combined.contains("United Kingdom") {
        "UK".to_string()
    } else if combined.contains("Deutschland")
        || combined.contains("Germany")
        || combined.contains("Berlin")
    {
        "DACH".to_string()
    } else if combined.contains("France") || combined.contains("Paris") {
        "FR".to_string()
    } else if combined.contains("Ireland") {
        "IE".to_string()
    } else if combined.contains("Spain")
        || combined.contains("España")
        || combined.contains("Madrid")
    {
        "ES".to_string()
    } else if combined.contains("Italy") || combined.contains("Italia") {
        "IT".to_string()
    } else if combined.contains("Poland") || combined.contains("Polska") {
        "PL".to_string()
    } else if combined.contains("Netherlands") || combined.contains("Nederland") {
        "NL".to_string()
    } else {
        "EU".to_string()
    }
}

/// Parses a feed timestamp: RFC 2822 (RSS pubDate) first, then RFC 3339
/// (Atom published/updated).
pub fn parse_published(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Deadline to assume when the source omits one.
pub fn placeholder_deadline(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(PLACEHOLDER_DEADLINE_DAYS)
}
