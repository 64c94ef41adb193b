//! Resume file → plain text. The pipeline only ever sees text.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DocumentParseError {
    #[error("unsupported document type '{0}'; upload a PDF or plain-text resume")]
    Unsupported(String),

    #[error("document contains no extractable text")]
    Empty,

    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, DocumentParseError>;
}

/// `.txt` and `.md` resumes. Invalid UTF-8 is decoded as Latin-1.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, DocumentParseError> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => {
                debug!("Resume is not valid UTF-8; decoding as Latin-1");
                bytes.iter().map(|&b| b as char).collect()
            }
        };
        non_empty(text)
    }
}

pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, DocumentParseError> {
        // pdf_extract can panic on malformed PDFs
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));

        match result {
            Ok(Ok(text)) => {
                debug!("PDF extracted: {} chars", text.len());
                non_empty(text)
            }
            Ok(Err(e)) => Err(DocumentParseError::Pdf(e.to_string())),
            Err(_) => Err(DocumentParseError::Pdf(
                "extractor panicked on a malformed PDF".to_string(),
            )),
        }
    }
}

/// Picks an extractor from the file extension.
pub fn extractor_for(filename: &str) -> Result<Box<dyn TextExtractor>, DocumentParseError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => Ok(Box::new(PdfTextExtractor)),
        "txt" | "md" | "text" => Ok(Box::new(PlainTextExtractor)),
        "" => Err(DocumentParseError::Unsupported(filename.to_string())),
        other => Err(DocumentParseError::Unsupported(format!(".{other}"))),
    }
}

fn non_empty(text: String) -> Result<String, DocumentParseError> {
    if text.trim().is_empty() {
        Err(DocumentParseError::Empty)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_utf8() {
        let text = PlainTextExtractor.extract("Résumé\nRust".as_bytes()).unwrap();
        assert_eq!(text, "Résumé\nRust");
    }

    #[test]
    fn test_plain_text_latin1_fallback() {
        // "café" in Latin-1
        let text = PlainTextExtractor.extract(&[0x63, 0x61, 0x66, 0xE9]).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_blank_text_is_rejected() {
        assert!(matches!(
            PlainTextExtractor.extract(b"  \n "),
            Err(DocumentParseError::Empty)
        ));
    }

    #[test]
    fn test_extractor_selection_by_extension() {
        assert!(extractor_for("resume.PDF").is_ok());
        assert!(extractor_for("resume.md").is_ok());
        assert!(matches!(
            extractor_for("resume.docx"),
            Err(DocumentParseError::Unsupported(ext)) if ext == ".docx"
        ));
        assert!(extractor_for("resume").is_err());
    }

    #[test]
    fn test_garbage_pdf_is_an_error_not_a_panic() {
        let result = PdfTextExtractor.extract(b"%PDF-1.4 definitely not a pdf");
        assert!(matches!(result, Err(DocumentParseError::Pdf(_))));
    }
}
