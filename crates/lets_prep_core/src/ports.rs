//! crates/lets_prep_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, parsers or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::{
    FileFormat, NewQuizSession, NewUploadedFile, QuestionType, QuizItem, QuizSession,
    QuizSessionSummary, UploadedFile, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures of the text extraction capability.
///
/// OCR confidence problems are not distinguished from other OCR failures.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("The file could not be read: {0}")]
    CorruptFile(String),
    #[error("No readable text was found in the file")]
    NoText,
    #[error("Image text recognition is not configured")]
    OcrUnavailable,
    #[error("Image text recognition failed: {0}")]
    OcrFailed(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Creates a user; fails with `PortError::Conflict` if the username is taken.
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user of a live auth session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Uploaded Files ---
    async fn create_uploaded_file(&self, file: NewUploadedFile) -> PortResult<UploadedFile>;

    async fn get_uploaded_file(&self, file_id: Uuid) -> PortResult<UploadedFile>;

    async fn count_uploaded_files(&self, owner_id: Uuid) -> PortResult<usize>;

    // --- Quiz Sessions ---
    /// Persists a session and all of its items atomically.
    async fn create_quiz_session(&self, session: NewQuizSession) -> PortResult<QuizSession>;

    /// Loads a session with its items in order.
    async fn get_quiz_session(&self, session_id: Uuid) -> PortResult<QuizSession>;

    /// Lists the sessions owned by `owner_id`, newest first, optionally truncated to `limit`.
    async fn list_quiz_sessions(
        &self,
        owner_id: Uuid,
        limit: Option<usize>,
    ) -> PortResult<Vec<QuizSessionSummary>>;

    /// Renames a session; `PortError::NotFound` if it does not exist for this owner.
    async fn rename_quiz_session(
        &self,
        session_id: Uuid,
        owner_id: Uuid,
        title: &str,
    ) -> PortResult<()>;

    /// Deletes a session and its items; `PortError::NotFound` if it does not exist for this owner.
    async fn delete_quiz_session(&self, session_id: Uuid, owner_id: Uuid) -> PortResult<()>;
}

/// The single capability every document format adapter sits behind.
#[async_trait]
pub trait TextExtractionService: Send + Sync {
    /// Turns raw file bytes of a declared format into plain text.
    async fn extract_text(&self, bytes: &[u8], format: FileFormat) -> Result<String, ExtractionError>;
}

#[async_trait]
pub trait OcrService: Send + Sync {
    /// Recognises the text in a PNG-encoded image.
    async fn recognize_text(&self, png_bytes: &[u8]) -> PortResult<String>;
}

#[async_trait]
pub trait QuizGenerationService: Send + Sync {
    /// Produces at most `count` study items of the given type from plain text.
    async fn generate_items(
        &self,
        text: &str,
        question_type: QuestionType,
        count: usize,
    ) -> PortResult<Vec<QuizItem>>;
}

#[async_trait]
pub trait FileStorageService: Send + Sync {
    /// Stores an upload and returns the path it was written to.
    async fn store(&self, owner_id: Uuid, format: FileFormat, bytes: &[u8]) -> PortResult<PathBuf>;
}
