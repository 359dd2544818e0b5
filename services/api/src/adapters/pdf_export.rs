//! services/api/src/adapters/pdf_export.rs
//!
//! Renders a quiz session as a printable PDF: a bold title line followed by every
//! item with its answer. Text is laid out top-down on US Letter pages, wrapping
//! long lines and starting new pages as needed. Lines that fit WinAnsi use the
//! standard Helvetica fonts; any other line is written as UTF-16 through a
//! Type0 font with the predefined `UniGB-UCS2-H` Unicode CMap, so its text
//! survives extraction unchanged.

use lets_prep_core::domain::{option_letter, QuizSession};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 50;
/// A new page starts once the cursor drops below this height.
const BOTTOM_LIMIT: i64 = 60;
const LINE_HEIGHT: i64 = 14;
const TITLE_GAP: i64 = 30;

const BODY_SIZE: i64 = 10;
const TITLE_SIZE: i64 = 16;
/// Line widths in half-em columns; wide (CJK) characters take two.
const BODY_WRAP_CHARS: usize = 100;
const TITLE_WRAP_CHARS: usize = 55;

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";
const UNICODE_FONT: &str = "F3";
const UNICODE_BASE_FONT: &str = "STSong-Light";
const UNICODE_CMAP: &str = "UniGB-UCS2-H";

#[derive(Debug, thiserror::Error)]
pub enum PdfExportError {
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),
}

//=========================================================================================
// Quiz Layout
//=========================================================================================

/// The body lines printed for a session, before wrapping.
pub fn quiz_lines(session: &QuizSession) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, item) in session.items.iter().enumerate() {
        lines.push(format!("{}. ({})", i + 1, item.question_type().label()));
        lines.extend(item.prompt().lines().map(str::to_string));

        for (index, option) in item.options().iter().enumerate() {
            if let Some(letter) = option_letter(index) {
                lines.push(format!("{}. {}", letter, option));
            }
        }

        if !item.answer().is_empty() {
            lines.push(format!("Answer: {}", item.answer()));
        }
        if let Some(letter) = item.correct_letter() {
            lines.push(format!("Correct option: {}", letter));
        }
        lines.push(String::new());
    }
    lines
}

pub fn render_quiz_pdf(session: &QuizSession) -> Result<Vec<u8>, PdfExportError> {
    let title = format!("LET'S PREP - {}", session.title);
    write_text_pdf(&title, &quiz_lines(session))
}

//=========================================================================================
// Text Encoding and Wrapping
//=========================================================================================

/// Characters a WinAnsi standard font can show, directly or folded to ASCII.
fn is_win_ansi(c: char) -> bool {
    matches!(
        c,
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201C}' | '\u{201D}' | '\u{201E}'
            | '\u{2013}' | '\u{2014}' | '\u{2212}' | '\u{2022}' | '\u{2026}'
    ) || c.is_control()
        || matches!(u32::from(c), 0x20..=0x7E | 0xA0..=0xFF)
}

/// Encodes text for a WinAnsi-encoded standard font. Typographic punctuation is
/// folded to ASCII; callers route anything else to [`encode_utf16`].
fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => bytes.push(b' '),
            '\u{2018}' | '\u{2019}' | '\u{201A}' => bytes.push(b'\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => bytes.push(b'"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => bytes.push(b'-'),
            '\u{2022}' => bytes.push(b'*'),
            '\u{2026}' => bytes.extend_from_slice(b"..."),
            c if c.is_control() => {}
            c => match u8::try_from(u32::from(c)) {
                Ok(b) if b < 0x80 || b >= 0xA0 => bytes.push(b),
                _ => bytes.push(b'?'),
            },
        }
    }
    bytes
}

/// Big-endian UTF-16 for the `UniGB-UCS2-H` font.
fn encode_utf16(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| match c {
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect::<String>()
        .encode_utf16()
        .flat_map(u16::to_be_bytes)
        .collect()
}

fn is_wide(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1100..=0x115F
            | 0x2E80..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x1F300..=0x1FAFF
            | 0x20000..=0x3FFFD
    )
}

fn char_width(c: char) -> usize {
    if is_wide(c) {
        2
    } else {
        1
    }
}

fn text_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Greedy word wrap to `width` columns; words wider than a line are split.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.iter().copied().map(char_width).sum::<usize>() > width {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let mut taken = 0;
            let mut used = 0;
            while taken < word.len() && used + char_width(word[taken]) <= width {
                used += char_width(word[taken]);
                taken += 1;
            }
            out.push(word.drain(..taken.max(1)).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let separator = usize::from(!current.is_empty());
        if text_width(&current) + separator + text_width(&word) > width {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || out.is_empty() {
        out.push(current);
    }
    out
}

//=========================================================================================
// Page Writer
//=========================================================================================

struct PageWriter {
    pages: Vec<Vec<Operation>>,
    y: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn line(&mut self, font: &str, size: i64, text: &str) {
        if self.y < BOTTOM_LIMIT {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }

        if !text.is_empty() {
            let (font, shown) = if text.chars().all(is_win_ansi) {
                (font, Object::string_literal(encode_win_ansi(text)))
            } else {
                (
                    UNICODE_FONT,
                    Object::String(encode_utf16(text), StringFormat::Hexadecimal),
                )
            };
            let ops = [
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![font.into(), size.into()]),
                Operation::new("Td", vec![MARGIN.into(), self.y.into()]),
                Operation::new("Tj", vec![shown]),
                Operation::new("ET", vec![]),
            ];
            if let Some(page) = self.pages.last_mut() {
                page.extend(ops);
            }
        }
    }
}

fn font(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// A non-embedded Adobe-GB1 CID font addressed by UCS-2 codes.
fn unicode_font(doc: &mut Document) -> ObjectId {
    let descriptor = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => UNICODE_BASE_FONT,
        "Flags" => 6,
        "FontBBox" => vec![
            Object::Integer(-25),
            Object::Integer(-254),
            Object::Integer(1000),
            Object::Integer(880),
        ],
        "ItalicAngle" => 0,
        "Ascent" => 880,
        "Descent" => -120,
        "CapHeight" => 880,
        "StemV" => 93,
    });
    let cid_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType0",
        "BaseFont" => UNICODE_BASE_FONT,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("GB1"),
            "Supplement" => 2,
        },
        "FontDescriptor" => descriptor,
        "DW" => 1000,
    });
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => UNICODE_BASE_FONT,
        "Encoding" => UNICODE_CMAP,
        "DescendantFonts" => vec![Object::Reference(cid_font)],
    })
}

/// Writes a document with a bold title and plain body lines.
pub fn write_text_pdf(title: &str, lines: &[String]) -> Result<Vec<u8>, PdfExportError> {
    let mut writer = PageWriter::new();
    for title_line in wrap(title, TITLE_WRAP_CHARS) {
        writer.line(BOLD_FONT, TITLE_SIZE, &title_line);
        writer.y -= LINE_HEIGHT + 6;
    }
    writer.y -= TITLE_GAP - LINE_HEIGHT - 6;

    for line in lines {
        for wrapped in wrap(line, BODY_WRAP_CHARS) {
            writer.line(REGULAR_FONT, BODY_SIZE, &wrapped);
            writer.y -= LINE_HEIGHT;
        }
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = font(&mut doc, "Helvetica");
    let bold = font(&mut doc, "Helvetica-Bold");
    let unicode = unicode_font(&mut doc);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR_FONT => regular,
            BOLD_FONT => bold,
            UNICODE_FONT => unicode,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(writer.pages.len());
    for operations in writer.pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}
