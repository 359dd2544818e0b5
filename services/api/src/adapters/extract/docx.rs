//! services/api/src/adapters/extract/docx.rs
//!
//! Extracts text from Microsoft Word DOCX files, one line per paragraph.

use super::ooxml::{open_archive, paragraphs, read_part, WORD_TAGS};
use lets_prep_core::ports::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_part(&mut archive, DOCUMENT_PART)?;
    Ok(paragraphs(&xml, &WORD_TAGS)?.join("\n"))
}
