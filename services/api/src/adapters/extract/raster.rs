//! services/api/src/adapters/extract/raster.rs
//!
//! Validates uploaded images and normalises them to a bounded PNG for OCR.

use image::imageops::FilterType;
use image::ImageFormat;
use lets_prep_core::domain::FileFormat;
use lets_prep_core::ports::ExtractionError;
use std::io::Cursor;
use tracing::debug;

/// Longest edge, in pixels, of an image sent to the OCR service.
const MAX_OCR_EDGE: u32 = 2048;

pub fn prepare_for_ocr(bytes: &[u8], format: FileFormat) -> Result<Vec<u8>, ExtractionError> {
    let image_format = match format {
        FileFormat::Jpg => ImageFormat::Jpeg,
        FileFormat::Png => ImageFormat::Png,
        other => {
            return Err(ExtractionError::UnsupportedFormat(format!(
                "{} is not an image format",
                other
            )))
        }
    };

    let mut img = image::load_from_memory_with_format(bytes, image_format)
        .map_err(|e| ExtractionError::CorruptFile(format!("failed to decode image: {}", e)))?;
    debug!("Decoded image {}x{}", img.width(), img.height());

    if img.width().max(img.height()) > MAX_OCR_EDGE {
        img = img.resize(MAX_OCR_EDGE, MAX_OCR_EDGE, FilterType::Triangle);
    }

    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, ImageFormat::Png)
        .map_err(|e| ExtractionError::CorruptFile(format!("failed to re-encode image: {}", e)))?;
    Ok(png.into_inner())
}
