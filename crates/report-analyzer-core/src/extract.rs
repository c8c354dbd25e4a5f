//! Document-to-text conversion for uploaded reports.

use std::panic;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// Infer the kind from a file name's extension (`.pdf` or `.txt`, any case).
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),
    #[error("PDF parser panicked")]
    PdfPanic,
    #[error("document is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Extract the text of a document, returning an empty string when it cannot be read.
///
/// Failures are logged and absorbed; an unreadable document is indistinguishable from an
/// empty one downstream.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> String {
    match try_extract_text(bytes, kind) {
        Ok(text) => text,
        Err(err) => {
            warn!(?kind, error = %err, "text extraction failed");
            String::new()
        }
    }
}

/// Like [`extract_text`] but reports why extraction failed.
pub fn try_extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
    match kind {
        DocumentKind::Text => Ok(String::from_utf8(bytes.to_vec())?),
        DocumentKind::Pdf => extract_pdf(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed content streams instead of returning an error.
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractionError::PdfPanic)?
        .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

    debug!(pages = pages.len(), "extracted PDF text");
    let mut text = String::new();
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_pdf(pages: &[&str]) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn kind_from_filename() {
        assert_eq!(
            DocumentKind::from_filename("labs.PDF"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_filename("notes.v2.txt"),
            Some(DocumentKind::Text)
        );
        assert_eq!(DocumentKind::from_filename("scan.png"), None);
        assert_eq!(DocumentKind::from_filename("README"), None);
    }

    #[test]
    fn text_is_decoded_verbatim() {
        let text = extract_text("  Glucose: 85\r\nHb 14 \n".as_bytes(), DocumentKind::Text);
        assert_eq!(text, "  Glucose: 85\r\nHb 14 \n");
    }

    #[test]
    fn invalid_utf8_becomes_empty() {
        assert_eq!(extract_text(&[0xff, 0xfe, 0x41], DocumentKind::Text), "");
        assert!(matches!(
            try_extract_text(&[0xff], DocumentKind::Text),
            Err(ExtractionError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn corrupt_pdf_becomes_empty() {
        assert_eq!(extract_text(b"not a pdf", DocumentKind::Pdf), "");
        assert!(try_extract_text(b"not a pdf", DocumentKind::Pdf).is_err());
    }

    #[test]
    fn pdf_pages_are_joined_in_order() {
        let pdf = make_test_pdf(&["Glucose 85", "Hemoglobin 14"]);
        let text = extract_text(&pdf, DocumentKind::Pdf);

        let glucose = text.find("Glucose").expect("first page text");
        let hemoglobin = text.find("Hemoglobin").expect("second page text");
        assert!(glucose < hemoglobin, "pages out of order: {text:?}");
        assert!(text.ends_with('\n'));
    }
}
