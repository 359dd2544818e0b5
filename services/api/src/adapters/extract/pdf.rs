//! services/api/src/adapters/extract/pdf.rs
//!
//! Extracts text from PDF documents page by page. Pages whose content cannot be
//! decoded are skipped with a warning rather than failing the whole document.

use lets_prep_core::ports::ExtractionError;
use lopdf::Document;
use tracing::warn;

pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| ExtractionError::CorruptFile(format!("failed to load PDF: {}", e)))?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ExtractionError::CorruptFile("PDF has no pages".to_string()));
    }

    let mut text = String::new();
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => {
                let page_text = page_text.trim_end();
                if !page_text.is_empty() {
                    text.push_str(page_text);
                    text.push('\n');
                }
            }
            Err(e) => warn!("Skipping unreadable PDF page {}: {}", page_number, e),
        }
    }

    Ok(text)
}
