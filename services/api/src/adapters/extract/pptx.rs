//! services/api/src/adapters/extract/pptx.rs
//!
//! Extracts text from PowerPoint PPTX files. Slides are read in numeric order
//! (`slide2.xml` before `slide10.xml`); slides that cannot be read are skipped.

use super::ooxml::{open_archive, paragraphs, read_part, DRAWING_TAGS};
use lets_prep_core::ports::ExtractionError;
use tracing::warn;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Parses `ppt/slides/slide<N>.xml` into `N`.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

pub fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = open_archive(bytes)?;

    if archive.by_name(PRESENTATION_PART).is_err() {
        return Err(ExtractionError::CorruptFile(format!(
            "cannot find {}",
            PRESENTATION_PART
        )));
    }

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_unstable_by_key(|(n, _)| *n);

    let mut chunks = Vec::new();
    for (number, name) in slides {
        let slide_text = read_part(&mut archive, &name).and_then(|xml| paragraphs(&xml, &DRAWING_TAGS));
        match slide_text {
            Ok(lines) => chunks.extend(lines),
            Err(e) => warn!("Skipping unreadable slide {}: {}", number, e),
        }
    }

    Ok(chunks.join("\n"))
}
