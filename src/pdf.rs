//! Page-level text extraction for uploaded PDF documents.
//!
//! Extraction is delegated to the `pdf-extract` crate; this module only reshapes its
//! output into 1-indexed pages and drops pages that carry no visible text (scanned
//! pages without an OCR layer are the common case).

use std::path::Path;
use thiserror::Error;

/// Errors raised while extracting text from a PDF file.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The PDF could not be opened or parsed.
    #[error("Failed to extract text from PDF: {0}")]
    Extraction(#[from] pdf_extract::OutputError),
}

/// Text content of a single PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-indexed page number within the source document.
    pub page_number: usize,
    /// Raw text extracted from the page.
    pub text: String,
}

/// Extract per-page text from the PDF at `path`.
///
/// Pages containing only whitespace are omitted; an empty vector therefore means the
/// document had no extractable text at all.
pub fn extract_pages(path: &Path) -> Result<Vec<PageText>, PdfError> {
    let pages = pdf_extract::extract_text_by_pages(path)?;
    tracing::debug!(path = %path.display(), pages = pages.len(), "Extracted PDF pages");
    Ok(pages_from_texts(pages))
}

fn pages_from_texts(texts: Vec<String>) -> Vec<PageText> {
    texts
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| PageText {
            page_number: index + 1,
            text,
        })
        .collect()
}
