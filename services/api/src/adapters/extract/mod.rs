//! services/api/src/adapters/extract/mod.rs
//!
//! Text extraction for every supported upload format. Documents are parsed on
//! the blocking thread pool; images are normalised and handed to the OCR port.

mod docx;
mod ooxml;
mod pdf;
mod pptx;
mod raster;
mod text;

pub use self::docx::extract_docx;
pub use self::pdf::extract_pdf;
pub use self::pptx::extract_pptx;
pub use self::raster::prepare_for_ocr;
pub use self::text::decode_text;

use async_trait::async_trait;
use lets_prep_core::domain::FileFormat;
use lets_prep_core::ports::{ExtractionError, OcrService, TextExtractionService};
use std::sync::Arc;
use tracing::{info, warn};

/// Dispatches a non-image document to its parser.
pub fn extract_document(bytes: &[u8], format: FileFormat) -> Result<String, ExtractionError> {
    match format {
        FileFormat::Pdf => extract_pdf(bytes),
        FileFormat::Docx => extract_docx(bytes),
        FileFormat::Pptx => extract_pptx(bytes),
        FileFormat::Txt => Ok(decode_text(bytes)),
        FileFormat::Jpg | FileFormat::Png => Err(ExtractionError::UnsupportedFormat(format!(
            "{} requires OCR",
            format
        ))),
    }
}

pub struct DocumentExtractor {
    ocr: Option<Arc<dyn OcrService>>,
}

impl DocumentExtractor {
    /// Without an OCR service, image uploads fail with `OcrUnavailable`.
    pub fn new(ocr: Option<Arc<dyn OcrService>>) -> Self {
        Self { ocr }
    }

    async fn extract_image(&self, bytes: &[u8], format: FileFormat) -> Result<String, ExtractionError> {
        let owned = bytes.to_vec();
        let png = tokio::task::spawn_blocking(move || prepare_for_ocr(&owned, format))
            .await
            .map_err(|e| ExtractionError::CorruptFile(format!("image task failed: {}", e)))??;

        let ocr = self.ocr.as_ref().ok_or(ExtractionError::OcrUnavailable)?;
        ocr.recognize_text(&png).await.map_err(|e| {
            warn!("OCR request failed: {}", e);
            ExtractionError::OcrFailed(e.to_string())
        })
    }
}

#[async_trait]
impl TextExtractionService for DocumentExtractor {
    async fn extract_text(&self, bytes: &[u8], format: FileFormat) -> Result<String, ExtractionError> {
        if bytes.is_empty() {
            return Err(ExtractionError::NoText);
        }

        let text = if format.is_image() {
            self.extract_image(bytes, format).await?
        } else {
            let owned = bytes.to_vec();
            tokio::task::spawn_blocking(move || extract_document(&owned, format))
                .await
                .map_err(|e| ExtractionError::CorruptFile(format!("parser task failed: {}", e)))??
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        info!("Extracted {} characters from {} upload", text.chars().count(), format);
        Ok(text)
    }
}
