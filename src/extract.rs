//! PDF text extraction for uploaded documents.
//!
//! Uploads are PDF-only; this module turns the raw bytes into the plain
//! UTF-8 text that becomes the session's document content. Page texts are
//! concatenated in page order with no separator guarantee between pages.

/// Extraction error. Not recovered locally; the presentation layer shows it.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts text from PDF bytes, all pages in page order.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Returns true when the file name looks like a PDF (the upload control
/// filters on extension; the server and CLI double-check).
pub fn is_pdf_filename(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pdf(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
        assert!(err.to_string().contains("PDF extraction failed"));
    }

    #[test]
    fn pdf_filename_check_is_case_insensitive() {
        assert!(is_pdf_filename("notes.pdf"));
        assert!(is_pdf_filename("NOTES.PDF"));
        assert!(!is_pdf_filename("notes.docx"));
        assert!(!is_pdf_filename("notes"));
    }
}
