//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lets_prep_core::domain::{
    NewQuizSession, NewUploadedFile, QuizItem, QuizSession, QuizSessionSummary, UploadedFile,
    User, UserCredentials,
};
use lets_prep_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use std::path::PathBuf;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        other => unexpected(other),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    username: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            username: self.username,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    username: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            username: self.username,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct UploadedFileRecord {
    id: Uuid,
    owner_id: Uuid,
    original_name: String,
    storage_path: String,
    format: String,
    text_excerpt: String,
    created_at: DateTime<Utc>,
}
impl UploadedFileRecord {
    fn to_domain(self) -> PortResult<UploadedFile> {
        Ok(UploadedFile {
            id: self.id,
            owner_id: self.owner_id,
            original_name: self.original_name,
            storage_path: PathBuf::from(self.storage_path),
            format: self.format.parse().map_err(PortError::Unexpected)?,
            text_excerpt: self.text_excerpt,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct QuizSessionRecord {
    id: Uuid,
    owner_id: Uuid,
    source_file_id: Option<Uuid>,
    title: String,
    question_type: String,
    created_at: DateTime<Utc>,
}
impl QuizSessionRecord {
    fn to_domain(self, items: Vec<QuizItem>) -> PortResult<QuizSession> {
        Ok(QuizSession {
            id: self.id,
            owner_id: self.owner_id,
            source_file_id: self.source_file_id,
            title: self.title,
            question_type: self.question_type.parse().map_err(PortError::Unexpected)?,
            created_at: self.created_at,
            items,
        })
    }
}

#[derive(FromRow)]
struct QuizSessionSummaryRecord {
    id: Uuid,
    source_file_id: Option<Uuid>,
    title: String,
    question_type: String,
    item_count: i64,
    created_at: DateTime<Utc>,
}
impl QuizSessionSummaryRecord {
    fn to_domain(self) -> PortResult<QuizSessionSummary> {
        Ok(QuizSessionSummary {
            id: self.id,
            source_file_id: self.source_file_id,
            title: self.title,
            question_type: self.question_type.parse().map_err(PortError::Unexpected)?,
            item_count: self.item_count.max(0) as usize,
            created_at: self.created_at,
        })
    }
}

/// One row of `quiz_items`. MCQ rows carry `options` and `correct_index`;
/// every other type stores its answer in `answer_text`.
#[derive(FromRow)]
struct QuizItemRecord {
    question_type: String,
    prompt: String,
    answer_text: String,
    options: Vec<String>,
    correct_index: Option<i32>,
    explanation: String,
}
impl QuizItemRecord {
    fn from_domain(item: &QuizItem) -> Self {
        let (answer_text, correct_index) = match item {
            QuizItem::Mcq { correct_index, .. } => (String::new(), Some(*correct_index as i32)),
            other => (other.answer().to_string(), None),
        };
        Self {
            question_type: item.question_type().as_str().to_string(),
            prompt: item.prompt().to_string(),
            answer_text,
            options: item.options().to_vec(),
            correct_index,
            explanation: item.explanation().to_string(),
        }
    }

    fn to_domain(self) -> PortResult<QuizItem> {
        let Self {
            question_type,
            prompt,
            answer_text: answer,
            options,
            correct_index,
            explanation,
        } = self;

        let item = match question_type.as_str() {
            "mcq" => {
                let correct_index = correct_index
                    .and_then(|i| usize::try_from(i).ok())
                    .filter(|i| *i < options.len())
                    .ok_or_else(|| {
                        PortError::Unexpected("MCQ row has no valid correct_index".to_string())
                    })?;
                QuizItem::Mcq {
                    prompt,
                    options,
                    correct_index,
                    explanation,
                }
            }
            "flashcard" => QuizItem::Flashcard { prompt, answer, explanation },
            "fill_blank" => QuizItem::FillBlank { prompt, answer, explanation },
            "short_answer" => QuizItem::ShortAnswer { prompt, answer, explanation },
            other => {
                return Err(PortError::Unexpected(format!(
                    "Unknown quiz item type '{}'",
                    other
                )))
            }
        };
        Ok(item)
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, username, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, username, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                PortError::Conflict(format!("Username '{}' is already taken", username))
            }
            other => unexpected(other),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, username, created_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, username, hashed_password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("User '{}' not found", username)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_uploaded_file(&self, file: NewUploadedFile) -> PortResult<UploadedFile> {
        let record = sqlx::query_as::<_, UploadedFileRecord>(
            "INSERT INTO uploaded_files (id, owner_id, original_name, storage_path, format, text_excerpt) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, owner_id, original_name, storage_path, format, text_excerpt, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(file.owner_id)
        .bind(&file.original_name)
        .bind(file.storage_path.to_string_lossy().into_owned())
        .bind(file.format.as_str())
        .bind(&file.text_excerpt)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_uploaded_file(&self, file_id: Uuid) -> PortResult<UploadedFile> {
        let record = sqlx::query_as::<_, UploadedFileRecord>(
            "SELECT id, owner_id, original_name, storage_path, format, text_excerpt, created_at \
             FROM uploaded_files WHERE id = $1",
        )
        .bind(file_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Uploaded file {} not found", file_id)))?;
        record.to_domain()
    }

    async fn count_uploaded_files(&self, owner_id: Uuid) -> PortResult<usize> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM uploaded_files WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count.max(0) as usize)
    }

    async fn create_quiz_session(&self, session: NewQuizSession) -> PortResult<QuizSession> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, QuizSessionRecord>(
            "INSERT INTO quiz_sessions (id, owner_id, source_file_id, title, question_type) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, owner_id, source_file_id, title, question_type, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(session.owner_id)
        .bind(session.source_file_id)
        .bind(&session.title)
        .bind(session.question_type.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        for (position, item) in session.items.iter().enumerate() {
            let row = QuizItemRecord::from_domain(item);
            sqlx::query(
                "INSERT INTO quiz_items \
                 (id, session_id, position, question_type, prompt, answer_text, options, correct_index, explanation) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(Uuid::new_v4())
            .bind(record.id)
            .bind(position as i32)
            .bind(row.question_type)
            .bind(row.prompt)
            .bind(row.answer_text)
            .bind(row.options)
            .bind(row.correct_index)
            .bind(row.explanation)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        record.to_domain(session.items)
    }

    async fn get_quiz_session(&self, session_id: Uuid) -> PortResult<QuizSession> {
        let record = sqlx::query_as::<_, QuizSessionRecord>(
            "SELECT id, owner_id, source_file_id, title, question_type, created_at \
             FROM quiz_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Quiz session {} not found", session_id)))?;

        let items = sqlx::query_as::<_, QuizItemRecord>(
            "SELECT question_type, prompt, answer_text, options, correct_index, explanation \
             FROM quiz_items WHERE session_id = $1 ORDER BY position ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(QuizItemRecord::to_domain)
        .collect::<PortResult<Vec<_>>>()?;

        record.to_domain(items)
    }

    async fn list_quiz_sessions(
        &self,
        owner_id: Uuid,
        limit: Option<usize>,
    ) -> PortResult<Vec<QuizSessionSummary>> {
        // A NULL limit means "no limit" in PostgreSQL.
        sqlx::query_as::<_, QuizSessionSummaryRecord>(
            "SELECT s.id, s.source_file_id, s.title, s.question_type, s.created_at, \
                    COUNT(i.id) AS item_count \
             FROM quiz_sessions s \
             LEFT JOIN quiz_items i ON i.session_id = s.id \
             WHERE s.owner_id = $1 \
             GROUP BY s.id \
             ORDER BY s.created_at DESC, s.id DESC \
             LIMIT $2",
        )
        .bind(owner_id)
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(QuizSessionSummaryRecord::to_domain)
        .collect()
    }

    async fn rename_quiz_session(
        &self,
        session_id: Uuid,
        owner_id: Uuid,
        title: &str,
    ) -> PortResult<()> {
        let result = sqlx::query("UPDATE quiz_sessions SET title = $1 WHERE id = $2 AND owner_id = $3")
            .bind(title)
            .bind(session_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Quiz session {} not found", session_id)));
        }
        Ok(())
    }

    async fn delete_quiz_session(&self, session_id: Uuid, owner_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM quiz_sessions WHERE id = $1 AND owner_id = $2")
            .bind(session_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Quiz session {} not found", session_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcq_rows_round_trip_through_records() {
        let item = QuizItem::Mcq {
            prompt: "Which?".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 3,
            explanation: "because".into(),
        };
        let row = QuizItemRecord::from_domain(&item);
        assert_eq!(row.question_type, "mcq");
        assert_eq!(row.correct_index, Some(3));
        assert_eq!(row.to_domain().unwrap(), item);
    }

    #[test]
    fn text_rows_keep_their_answer() {
        let item = QuizItem::FillBlank {
            prompt: "The _____ stores DNA".into(),
            answer: "nucleus".into(),
            explanation: String::new(),
        };
        let row = QuizItemRecord::from_domain(&item);
        assert!(row.options.is_empty());
        assert_eq!(row.to_domain().unwrap(), item);
    }

    #[test]
    fn corrupt_mcq_rows_are_rejected() {
        let row = QuizItemRecord {
            question_type: "mcq".into(),
            prompt: "Which?".into(),
            answer_text: String::new(),
            options: vec!["a".into()],
            correct_index: Some(4),
            explanation: String::new(),
        };
        assert!(matches!(row.to_domain(), Err(PortError::Unexpected(_))));
    }
}
