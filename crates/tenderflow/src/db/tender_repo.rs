//! Tender repository: normalized procurement notices keyed by source URL.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw tender row from the database.
#[derive(Debug, Clone)]
pub struct TenderRow {
    pub id: String,
    pub source: String,
    pub url: String,
    pub title: String,
    pub description_raw: String,
    pub short_description: String,
    pub authority: Option<String>,
    pub country: Option<String>,
    /// Ordered CPV-like category codes, JSON-encoded array.
    pub cpv_codes: String,
    pub budget: Option<String>,
    pub deadline: Option<String>,
    pub published_at: Option<String>,
    /// Heuristic default written at ingest time; list-time ranking
    /// recomputes per viewing company and overrides this.
    pub relevance_score: i64,
    /// JSON-encoded array of explanation strings.
    pub matched_reasons: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TenderRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            source: row.get("source")?,
            url: row.get("url")?,
            title: row.get("title")?,
            description_raw: row.get("description_raw")?,
            short_description: row.get("short_description")?,
            authority: row.get("authority")?,
            country: row.get("country")?,
            cpv_codes: row.get("cpv_codes")?,
            budget: row.get("budget")?,
            deadline: row.get("deadline")?,
            published_at: row.get("published_at")?,
            relevance_score: row.get("relevance_score")?,
            matched_reasons: row.get("matched_reasons")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Decodes the stored CPV code list.
    pub fn cpv_code_list(&self) -> Vec<String> {
        serde_json::from_str(&self.cpv_codes).unwrap_or_default()
    }

    /// Decodes the stored explanation strings.
    pub fn matched_reason_list(&self) -> Vec<String> {
        serde_json::from_str(&self.matched_reasons).unwrap_or_default()
    }
}

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

/// Creates or updates a tender keyed by its source URL.
///
/// A record with the same URL is updated in place, never duplicated; the
/// existing `id` and `created_at` are preserved on update.
pub fn upsert(db: &Database, tender: &TenderRow) -> Result<Upserted, DatabaseError> {
    db.with_conn(|conn| {
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM tenders WHERE url = ?1",
                params![tender.url],
                |r| r.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE tenders SET source=?2, title=?3, description_raw=?4,
                     short_description=?5, authority=?6, country=?7, cpv_codes=?8,
                     budget=?9, deadline=?10, published_at=?11, relevance_score=?12,
                     matched_reasons=?13, updated_at=?14
                     WHERE id=?1",
                    params![
                        id,
                        tender.source,
                        tender.title,
                        tender.description_raw,
                        tender.short_description,
                        tender.authority,
                        tender.country,
                        tender.cpv_codes,
                        tender.budget,
                        tender.deadline,
                        tender.published_at,
                        tender.relevance_score,
                        tender.matched_reasons,
                        tender.updated_at,
                    ],
                )?;
                Ok(Upserted::Updated)
            }
            None => {
                conn.execute(
                    "INSERT INTO tenders (id, source, url, title, description_raw,
                     short_description, authority, country, cpv_codes, budget, deadline,
                     published_at, relevance_score, matched_reasons, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                    params![
                        tender.id,
                        tender.source,
                        tender.url,
                        tender.title,
                        tender.description_raw,
                        tender.short_description,
                        tender.authority,
                        tender.country,
                        tender.cpv_codes,
                        tender.budget,
                        tender.deadline,
                        tender.published_at,
                        tender.relevance_score,
                        tender.matched_reasons,
                        tender.created_at,
                        tender.updated_at,
                    ],
                )?;
                Ok(Upserted::Created)
            }
        }
    })
}

/// Finds a tender by its source URL.
pub fn find_by_url(db: &Database, url: &str) -> Result<Option<TenderRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM tenders WHERE url = ?1",
                params![url],
                |r| TenderRow::from_row(r),
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists the most recently published tenders.
pub fn list_recent(db: &Database, limit: u64) -> Result<Vec<TenderRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM tenders ORDER BY published_at DESC, created_at DESC LIMIT ?1",
        )?;
        let rows: Vec<TenderRow> = stmt
            .query_map(params![limit as i64], TenderRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts all stored tenders.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM tenders", [], |r| r.get(0))?;
        Ok(count)
    })
}
