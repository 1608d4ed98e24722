//! Shared builders for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::{dictionary, Document, Object, Stream};

use tenderflow::analysis::AnalysisEngine;
use tenderflow::db::{job_repo, Database};
use tenderflow::jobs::types::{JobPayload, INITIAL_PROGRESS};

/// Builds a minimal single-page PDF containing the given text.
pub fn sample_pdf(content_text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.new_object_id();
    let resources_id = doc.new_object_id();
    let content_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    doc.objects.insert(
        font_id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        }),
    );

    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        }),
    );

    let content = format!("BT /F1 12 Tf 50 700 Td ({}) Tj ET", content_text);
    let content_stream = Stream::new(dictionary! {}, content.into_bytes());
    doc.objects
        .insert(content_id, Object::Stream(content_stream));

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        }),
    );

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A PDF with a page but no text content at all.
pub fn empty_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Text long enough to clear the extraction threshold.
pub fn tender_text() -> &'static str {
    "Invitation to tender for the provision of managed cloud platform services \
     to a public authority, including migration, operation and support."
}

/// An analysis engine pinned to the deterministic demo path.
pub fn demo_engine() -> Arc<AnalysisEngine> {
    Arc::new(AnalysisEngine::new(None, true))
}

/// Writes a PDF into `dir` and inserts a pending `pdf_analysis` job for
/// it, returning the job id.
pub fn enqueue_pdf_job(db: &Database, dir: &Path, name: &str, pdf_bytes: &[u8]) -> String {
    let file_path: PathBuf = dir.join(name);
    std::fs::write(&file_path, pdf_bytes).unwrap();

    let payload = JobPayload::PdfAnalysis {
        file_path,
        original_name: name.to_string(),
        company_context: BTreeMap::new(),
    };
    insert_pending(db, &payload)
}

/// Inserts a pending job row for an arbitrary payload, returning its id.
pub fn insert_pending(db: &Database, payload: &JobPayload) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let row = job_repo::JobRow {
        id: id.clone(),
        job_type: payload.job_type().as_str().to_string(),
        status: "pending".to_string(),
        payload: serde_json::to_string(payload).unwrap(),
        progress: INITIAL_PROGRESS,
        result: None,
        created_at: now.clone(),
        updated_at: now,
        started_at: None,
        completed_at: None,
    };
    job_repo::insert(db, &row).unwrap();
    id
}
