//! Text extraction for uploaded documents.
//!
//! The upload boundary accepts binary files; this module turns them into
//! plain UTF-8 text before the pipeline sees them. PDF goes through
//! `pdf-extract`; plain text and markdown pass through after UTF-8
//! validation. Anything else is rejected as caller input error.

use crate::error::{Result, ServiceError};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

/// Guess a supported content type from a file name. Unknown extensions are
/// treated as plain text; the UTF-8 check in [`extract_text`] catches
/// binary uploads masquerading as text.
pub fn detect_content_type(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        MIME_PDF
    } else if lower.ends_with(".md") || lower.ends_with(".markdown") {
        MIME_MARKDOWN
    } else {
        MIME_TEXT
    }
}

/// Extract plain text from binary content.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String> {
    match content_type {
        MIME_PDF => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ServiceError::Input(format!("PDF extraction failed: {}", e))),
        MIME_TEXT | MIME_MARKDOWN => String::from_utf8(bytes.to_vec())
            .map_err(|_| ServiceError::Input("file is not valid UTF-8 text".to_string())),
        other => Err(ServiceError::Input(format!(
            "unsupported content type: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_content_type() {
        assert_eq!(detect_content_type("handbook.PDF"), MIME_PDF);
        assert_eq!(detect_content_type("notes.md"), MIME_MARKDOWN);
        assert_eq!(detect_content_type("readme.txt"), MIME_TEXT);
        assert_eq!(detect_content_type("no-extension"), MIME_TEXT);
    }

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text("hello world".as_bytes(), MIME_TEXT).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = extract_text(&[0xff, 0xfe, 0x00], MIME_TEXT).unwrap_err();
        assert!(matches!(err, ServiceError::Input(_)));
    }

    #[test]
    fn test_invalid_pdf_rejected() {
        let err = extract_text(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ServiceError::Input(_)));
    }

    #[test]
    fn test_unsupported_content_type_rejected() {
        let err = extract_text(b"...", "application/octet-stream").unwrap_err();
        assert!(matches!(err, ServiceError::Input(_)));
    }
}
