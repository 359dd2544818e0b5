//! crates/lets_prep_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Upper bound on how many items a single quiz may request.
pub const MAX_QUESTIONS: usize = 50;

/// Number of items generated when the caller does not ask for a specific count.
pub const DEFAULT_QUESTIONS: usize = 10;

/// Number of characters of extracted text kept alongside an uploaded file.
pub const TEXT_EXCERPT_CHARS: usize = 1000;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub hashed_password: String,
}

//=========================================================================================
// Uploaded Files
//=========================================================================================

/// The document formats the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Pdf,
    Docx,
    Pptx,
    Txt,
    Jpg,
    Png,
}

impl FileFormat {
    /// Determines the format from a file name's extension (case-insensitive).
    /// Returns `None` for anything the extractor does not handle.
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();

        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "txt" => Some(Self::Txt),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Txt => "txt",
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Jpg | Self::Png)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "pptx" => Ok(Self::Pptx),
            "txt" => Ok(Self::Txt),
            "jpg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            other => Err(format!("unknown file format '{}'", other)),
        }
    }
}

/// A document uploaded by a user. Immutable once stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub original_name: String,
    pub storage_path: PathBuf,
    pub format: FileFormat,
    pub text_excerpt: String,
    pub created_at: DateTime<Utc>,
}

/// The data needed to record a freshly stored upload.
#[derive(Debug, Clone)]
pub struct NewUploadedFile {
    pub owner_id: Uuid,
    pub original_name: String,
    pub storage_path: PathBuf,
    pub format: FileFormat,
    pub text_excerpt: String,
}

/// Returns the first `TEXT_EXCERPT_CHARS` characters of `text`.
pub fn text_excerpt(text: &str) -> String {
    text.chars().take(TEXT_EXCERPT_CHARS).collect()
}

//=========================================================================================
// Quiz Items
//=========================================================================================

/// The style of study item a quiz is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    Flashcard,
    FillBlank,
    ShortAnswer,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::Mcq,
        QuestionType::Flashcard,
        QuestionType::FillBlank,
        QuestionType::ShortAnswer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::Flashcard => "flashcard",
            Self::FillBlank => "fill_blank",
            Self::ShortAnswer => "short_answer",
        }
    }

    /// Human readable label, as shown in listings and exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mcq => "Multiple Choice",
            Self::Flashcard => "Flashcards",
            Self::FillBlank => "Fill in the Blanks",
            Self::ShortAnswer => "Short Answer",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcq" => Ok(Self::Mcq),
            "flashcard" => Ok(Self::Flashcard),
            "fill_blank" | "fill-in" | "fill" => Ok(Self::FillBlank),
            "short_answer" => Ok(Self::ShortAnswer),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

/// A single generated study item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizItem {
    Flashcard {
        prompt: String,
        answer: String,
        explanation: String,
    },
    Mcq {
        prompt: String,
        options: Vec<String>,
        correct_index: usize,
        explanation: String,
    },
    FillBlank {
        prompt: String,
        answer: String,
        explanation: String,
    },
    ShortAnswer {
        prompt: String,
        answer: String,
        explanation: String,
    },
}

impl QuizItem {
    pub fn question_type(&self) -> QuestionType {
        match self {
            Self::Flashcard { .. } => QuestionType::Flashcard,
            Self::Mcq { .. } => QuestionType::Mcq,
            Self::FillBlank { .. } => QuestionType::FillBlank,
            Self::ShortAnswer { .. } => QuestionType::ShortAnswer,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Self::Flashcard { prompt, .. }
            | Self::Mcq { prompt, .. }
            | Self::FillBlank { prompt, .. }
            | Self::ShortAnswer { prompt, .. } => prompt,
        }
    }

    /// The expected answer. For MCQ items this is the text of the correct option.
    pub fn answer(&self) -> &str {
        match self {
            Self::Flashcard { answer, .. }
            | Self::FillBlank { answer, .. }
            | Self::ShortAnswer { answer, .. } => answer,
            Self::Mcq {
                options,
                correct_index,
                ..
            } => options.get(*correct_index).map(String::as_str).unwrap_or(""),
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            Self::Flashcard { explanation, .. }
            | Self::Mcq { explanation, .. }
            | Self::FillBlank { explanation, .. }
            | Self::ShortAnswer { explanation, .. } => explanation,
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            Self::Mcq { options, .. } => options,
            _ => &[],
        }
    }

    /// The correct option as a letter (`A`, `B`, ...), for MCQ items only.
    pub fn correct_letter(&self) -> Option<char> {
        match self {
            Self::Mcq { correct_index, .. } => option_letter(*correct_index),
            _ => None,
        }
    }
}

/// Maps an option index to its letter, `0 -> 'A'`.
pub fn option_letter(index: usize) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| (b'A' + i) as char)
}

/// Maps an option letter back to its index, `'b' -> 1`.
pub fn option_index(letter: char) -> Option<usize> {
    let upper = letter.to_ascii_uppercase();
    upper
        .is_ascii_uppercase()
        .then(|| (upper as u8 - b'A') as usize)
}

//=========================================================================================
// Quiz Sessions
//=========================================================================================

/// One generated set of study items tied to one source file and one owner.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub source_file_id: Option<Uuid>,
    pub title: String,
    pub question_type: QuestionType,
    pub created_at: DateTime<Utc>,
    pub items: Vec<QuizItem>,
}

/// The listing projection of a quiz session, used by history and dashboard views.
#[derive(Debug, Clone)]
pub struct QuizSessionSummary {
    pub id: Uuid,
    pub source_file_id: Option<Uuid>,
    pub title: String,
    pub question_type: QuestionType,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&QuizSession> for QuizSessionSummary {
    fn from(session: &QuizSession) -> Self {
        Self {
            id: session.id,
            source_file_id: session.source_file_id,
            title: session.title.clone(),
            question_type: session.question_type,
            item_count: session.items.len(),
            created_at: session.created_at,
        }
    }
}

/// The data needed to persist a freshly generated quiz.
#[derive(Debug, Clone)]
pub struct NewQuizSession {
    pub owner_id: Uuid,
    pub source_file_id: Option<Uuid>,
    pub title: String,
    pub question_type: QuestionType,
    pub items: Vec<QuizItem>,
}
