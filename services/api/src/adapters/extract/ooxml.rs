//! services/api/src/adapters/extract/ooxml.rs
//!
//! Shared plumbing for Office Open XML containers (DOCX, PPTX): both are ZIP
//! archives whose text lives in paragraph/run elements of XML parts.

use lets_prep_core::ports::ExtractionError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Element names that carry text for one OOXML dialect.
pub(crate) struct TextTags {
    pub paragraph: &'static [u8],
    pub text: &'static [u8],
    /// Empty elements rendered as a single space (tabs, line breaks).
    pub spacers: &'static [&'static [u8]],
}

/// WordprocessingML (`word/document.xml`).
pub(crate) const WORD_TAGS: TextTags = TextTags {
    paragraph: b"w:p",
    text: b"w:t",
    spacers: &[b"w:tab", b"w:br", b"w:cr"],
};

/// DrawingML, used for the text bodies of PowerPoint slides.
pub(crate) const DRAWING_TAGS: TextTags = TextTags {
    paragraph: b"a:p",
    text: b"a:t",
    spacers: &[b"a:br"],
};

pub(crate) type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub(crate) fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, ExtractionError> {
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::CorruptFile(format!("not a valid Office container: {}", e)))
}

/// Reads one XML part of the archive as a string.
pub(crate) fn read_part(archive: &mut Archive<'_>, name: &str) -> Result<String, ExtractionError> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| ExtractionError::CorruptFile(format!("cannot find {}: {}", name, e)))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ExtractionError::CorruptFile(format!("cannot read {}: {}", name, e)))?;
    Ok(xml)
}

fn flush(current: &mut String, paragraphs: &mut Vec<String>) {
    let para = current.trim();
    if !para.is_empty() {
        paragraphs.push(para.to_string());
    }
    current.clear();
}

/// Streams an XML part and returns its non-empty paragraphs in document order.
pub(crate) fn paragraphs(xml: &str, tags: &TextTags) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if name.as_ref() == tags.text {
                    in_text = true;
                } else if name.as_ref() == tags.paragraph {
                    // Text boxes nest paragraphs; treat the inner one as a new line.
                    flush(&mut current, &mut paragraphs);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if name.as_ref() == tags.text {
                    in_text = false;
                } else if name.as_ref() == tags.paragraph {
                    flush(&mut current, &mut paragraphs);
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                if tags.spacers.iter().any(|s| *s == name.as_ref()) {
                    current.push(' ');
                }
            }
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| ExtractionError::CorruptFile(format!("bad XML text: {}", e)))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::CorruptFile(format!(
                    "XML error at position {}: {:?}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    flush(&mut current, &mut paragraphs);
    Ok(paragraphs)
}
