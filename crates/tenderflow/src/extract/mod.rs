//! PDF text extraction.
//!
//! Best-effort plain-text extraction with lopdf. Documents that yield
//! fewer than `MIN_TEXT_CHARS` characters are rejected as unreadable so
//! they never reach the analysis engine.

use thiserror::Error;

/// Minimum number of extracted characters for a document to be analyzable.
pub const MIN_TEXT_CHARS: usize = 50;

/// Errors from text extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The bytes could not be parsed as a PDF.
    #[error("failed to decode PDF: {0}")]
    Decode(String),

    /// The document parsed but contains no usable text.
    #[error("document appears empty or unreadable ({chars} characters extracted)")]
    EmptyDocument { chars: usize },
}

/// Extracted document text plus page count.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub pages: usize,
}

/// Stateless PDF text extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts plain text from raw PDF bytes.
    ///
    /// Pure transform: no side effects. Pages that fail individually are
    /// skipped; the emptiness check below catches documents where nothing
    /// was recoverable.
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Decode(e.to_string()))?;

        let pages = doc.get_pages();
        let page_count = pages.len();

        let mut text = String::new();
        for (page_num, _) in pages {
            if let Ok(page_text) = doc.extract_text(&[page_num]) {
                text.push_str(&page_text);
                text.push('\n');
            }
        }

        let chars = text.trim().chars().count();
        if chars < MIN_TEXT_CHARS {
            return Err(ExtractError::EmptyDocument { chars });
        }

        Ok(ExtractedText {
            text,
            pages: page_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a minimal single-page PDF containing the given text.
    fn pdf_with_text(content_text: &str) -> Vec<u8> {
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

    /// Builds a PDF with one page and no content stream.
    fn pdf_without_text() -> Vec<u8> {
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

    #[test]
    fn test_extracts_text_and_page_count() {
        let text = "Invitation to tender for the provision of cloud platform services";
        let bytes = pdf_with_text(text);

        let extracted = PdfExtractor::new().extract(&bytes).unwrap();
        assert!(extracted.text.contains("cloud platform services"));
        assert_eq!(extracted.pages, 1);
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let bytes = pdf_without_text();

        let err = PdfExtractor::new().extract(&bytes).unwrap_err();
        match err {
            ExtractError::EmptyDocument { chars } => assert_eq!(chars, 0),
            other => panic!("expected EmptyDocument, got {:?}", other),
        }
    }

    #[test]
    fn test_short_text_below_threshold_is_rejected() {
        // Parses fine but extracts fewer than MIN_TEXT_CHARS characters.
        let bytes = pdf_with_text("Too short");

        let err = PdfExtractor::new().extract(&bytes).unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument { .. }));
        assert!(err.to_string().contains("empty or unreadable"));
    }

    #[test]
    fn test_garbage_bytes_fail_decoding() {
        let err = PdfExtractor::new()
            .extract(b"%PDF-1.4 this is not a real pdf body")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Decode(_)));
    }
}
