//! services/api/src/web/quiz.rs
//!
//! The quiz handlers: upload-and-generate, play, grading, PDF export and the
//! rename/delete session management endpoints. Every session lookup is scoped
//! to the caller; sessions owned by someone else are reported as missing.

use crate::adapters::pdf_export::render_quiz_pdf;
use crate::web::{
    rest::{extraction_error_response, port_error_response},
    state::AppState,
};
use axum::{
    extract::{multipart::MultipartError, Extension, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use lets_prep_core::{
    domain::{
        text_excerpt, FileFormat, NewQuizSession, NewUploadedFile, QuestionType,
        QuizItem, QuizSession, DEFAULT_QUESTIONS, MAX_QUESTIONS,
    },
    grading::{grade_response, QuizScore},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

const MAX_TITLE_CHARS: usize = 255;

//=========================================================================================
// Upload Form
//=========================================================================================

/// The raw multipart fields of a quiz request, before validation.
#[derive(Default)]
struct QuizFormInput {
    title: Option<String>,
    question_type: Option<String>,
    num_questions: Option<String>,
    file: Option<(String, Bytes)>,
}

/// A validated quiz request.
#[derive(Debug)]
struct QuizRequest {
    title: String,
    question_type: QuestionType,
    num_questions: usize,
    file_name: String,
    bytes: Bytes,
}

fn validate_title(title: &str) -> Result<String, String> {
    let title = title.trim();
    let count = title.chars().count();
    if count == 0 || count > MAX_TITLE_CHARS {
        return Err(format!(
            "Title must be between 1 and {} characters",
            MAX_TITLE_CHARS
        ));
    }
    Ok(title.to_string())
}

impl QuizFormInput {
    fn validate(self) -> Result<QuizRequest, String> {
        let title = validate_title(self.title.as_deref().unwrap_or(""))?;

        let question_type = self
            .question_type
            .as_deref()
            .ok_or_else(|| "question_type is required".to_string())
            .and_then(QuestionType::from_str)?;

        let num_questions = match self.num_questions.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_QUESTIONS,
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=MAX_QUESTIONS).contains(n))
                .ok_or_else(|| {
                    format!("num_questions must be a number between 1 and {}", MAX_QUESTIONS)
                })?,
        };

        let (file_name, bytes) = self
            .file
            .ok_or_else(|| "A study file is required".to_string())?;

        Ok(QuizRequest {
            title,
            question_type,
            num_questions,
            file_name,
            bytes,
        })
    }
}

fn multipart_error(e: MultipartError) -> (StatusCode, String) {
    (e.status(), format!("Failed to read multipart data: {}", e.body_text()))
}

async fn read_quiz_form(mut multipart: Multipart) -> Result<QuizFormInput, (StatusCode, String)> {
    let mut input = QuizFormInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                input.file = Some((file_name, bytes));
            }
            "title" => input.title = Some(field.text().await.map_err(multipart_error)?),
            "question_type" => {
                input.question_type = Some(field.text().await.map_err(multipart_error)?)
            }
            "num_questions" => {
                input.num_questions = Some(field.text().await.map_err(multipart_error)?)
            }
            _ => {}
        }
    }

    Ok(input)
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct QuizCreatedResponse {
    pub session_id: Uuid,
    pub source_file_id: Uuid,
    pub title: String,
    pub question_type: String,
    pub item_count: usize,
}

/// A quiz item as presented for play. Answers are only filled in when revealed.
#[derive(Serialize, ToSchema)]
pub struct QuizItemDto {
    /// 1-based position within the session.
    pub position: usize,
    pub question_type: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: Option<String>,
    pub correct_option: Option<String>,
    pub explanation: Option<String>,
}

impl QuizItemDto {
    fn new(position: usize, item: &QuizItem, reveal: bool) -> Self {
        let explanation = Some(item.explanation())
            .filter(|e| reveal && !e.is_empty())
            .map(str::to_string);
        Self {
            position,
            question_type: item.question_type().as_str().to_string(),
            prompt: item.prompt().to_string(),
            options: item.options().to_vec(),
            answer: reveal.then(|| item.answer().to_string()),
            correct_option: item
                .correct_letter()
                .filter(|_| reveal)
                .map(|c| c.to_string()),
            explanation,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuizDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub question_type: String,
    pub question_type_label: String,
    pub source_file_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub revealed: bool,
    pub items: Vec<QuizItemDto>,
}

#[derive(Deserialize, Default)]
pub struct DetailParams {
    #[serde(default)]
    pub reveal: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmittedAnswer {
    /// 1-based position of the answered item.
    pub position: usize,
    pub response: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckAnswersRequest {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Serialize, ToSchema)]
pub struct ItemResult {
    pub position: usize,
    pub response: Option<String>,
    pub correct: bool,
    pub expected_answer: String,
    pub correct_option: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ScoreDto {
    pub correct: usize,
    pub total: usize,
    pub percent: u32,
}

#[derive(Serialize, ToSchema)]
pub struct CheckAnswersResponse {
    pub results: Vec<ItemResult>,
    pub score: ScoreDto,
}

#[derive(Deserialize, ToSchema)]
pub struct RenameRequest {
    pub title: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Loads a session, treating sessions owned by someone else as missing.
async fn load_owned_session(
    state: &AppState,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<QuizSession, (StatusCode, String)> {
    let session = state
        .db
        .get_quiz_session(session_id)
        .await
        .map_err(|e| port_error_response("Failed to load quiz session", e))?;

    if session.owner_id != user_id {
        return Err((StatusCode::NOT_FOUND, "Not found".to_string()));
    }
    Ok(session)
}

/// Grades every item of `session`; unanswered items count as wrong.
fn grade_session(session: &QuizSession, answers: Vec<SubmittedAnswer>) -> CheckAnswersResponse {
    let mut responses: HashMap<usize, String> = answers
        .into_iter()
        .map(|a| (a.position, a.response))
        .collect();

    let results: Vec<ItemResult> = session
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let position = i + 1;
            let response = responses.remove(&position);
            let correct = response
                .as_deref()
                .is_some_and(|r| grade_response(item, r));
            ItemResult {
                position,
                response,
                correct,
                expected_answer: item.answer().to_string(),
                correct_option: item.correct_letter().map(|c| c.to_string()),
                explanation: Some(item.explanation())
                    .filter(|e| !e.is_empty())
                    .map(str::to_string),
            }
        })
        .collect();

    let score = QuizScore::tally(results.iter().map(|r| r.correct));
    CheckAnswersResponse {
        results,
        score: ScoreDto {
            correct: score.correct,
            total: score.total,
            percent: score.percent(),
        },
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Upload a study file and generate a new quiz from it.
///
/// Accepts a multipart/form-data request with `title`, `file`, `question_type`
/// and an optional `num_questions` (default 10).
#[utoipa::path(
    post,
    path = "/new-quiz/",
    request_body(content_type = "multipart/form-data", description = "The quiz form and the study file."),
    responses(
        (status = 201, description = "Quiz generated", body = QuizCreatedResponse),
        (status = 400, description = "Invalid form"),
        (status = 401, description = "Not logged in"),
        (status = 415, description = "Unsupported file format"),
        (status = 422, description = "The file could not be read or yielded no usable text"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn new_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Validate the form and the file type
    let request = read_quiz_form(multipart)
        .await?
        .validate()
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    let format = FileFormat::from_filename(&request.file_name).ok_or_else(|| {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!(
                "Unsupported file type '{}'. Upload a PDF, DOCX, PPTX, TXT, JPG or PNG file.",
                request.file_name
            ),
        )
    })?;

    // 2. Extract the text
    let text = state
        .extractor
        .extract_text(&request.bytes, format)
        .await
        .map_err(extraction_error_response)?;

    // 3. Generate the items; nothing is stored for a rejected upload
    let items = state
        .generator
        .generate_items(&text, request.question_type, request.num_questions)
        .await
        .map_err(|e| port_error_response("Failed to generate questions", e))?;

    if items.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Not enough text in the file to generate questions".to_string(),
        ));
    }

    // 4. Store the upload and record it
    let storage_path = state
        .storage
        .store(user_id, format, &request.bytes)
        .await
        .map_err(|e| port_error_response("Failed to store upload", e))?;

    let uploaded = state
        .db
        .create_uploaded_file(NewUploadedFile {
            owner_id: user_id,
            original_name: request.file_name.clone(),
            storage_path,
            format,
            text_excerpt: text_excerpt(&text),
        })
        .await
        .map_err(|e| port_error_response("Failed to record upload", e))?;

    // 5. Persist the session
    let session = state
        .db
        .create_quiz_session(NewQuizSession {
            owner_id: user_id,
            source_file_id: Some(uploaded.id),
            title: request.title,
            question_type: request.question_type,
            items,
        })
        .await
        .map_err(|e| port_error_response("Failed to save quiz session", e))?;

    info!(
        "Generated quiz {} with {} {} items from '{}'",
        session.id,
        session.items.len(),
        session.question_type,
        uploaded.original_name
    );

    let response = QuizCreatedResponse {
        session_id: session.id,
        source_file_id: uploaded.id,
        title: session.title,
        question_type: session.question_type.as_str().to_string(),
        item_count: session.items.len(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// A quiz ready for play. Answers are included only with `?reveal=true`.
#[utoipa::path(
    get,
    path = "/quiz/{id}/",
    params(
        ("id" = Uuid, Path, description = "Quiz session id"),
        ("reveal" = Option<bool>, Query, description = "Include answers and explanations")
    ),
    responses(
        (status = 200, description = "Quiz detail", body = QuizDetailResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such quiz for this user")
    )
)]
pub async fn quiz_detail_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<DetailParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = load_owned_session(&state, session_id, user_id).await?;

    let items = session
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| QuizItemDto::new(i + 1, item, params.reveal))
        .collect();

    Ok(Json(QuizDetailResponse {
        id: session.id,
        title: session.title,
        question_type: session.question_type.as_str().to_string(),
        question_type_label: session.question_type.label().to_string(),
        source_file_id: session.source_file_id,
        created_at: session.created_at,
        revealed: params.reveal,
        items,
    }))
}

/// Grade a set of answers against a quiz.
#[utoipa::path(
    post,
    path = "/quiz/{id}/check/",
    params(("id" = Uuid, Path, description = "Quiz session id")),
    request_body = CheckAnswersRequest,
    responses(
        (status = 200, description = "Per-item results and score", body = CheckAnswersResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such quiz for this user")
    )
)]
pub async fn check_answers_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CheckAnswersRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = load_owned_session(&state, session_id, user_id).await?;
    Ok(Json(grade_session(&session, req.answers)))
}

/// Download the quiz with its answers as a PDF.
#[utoipa::path(
    get,
    path = "/quiz/{id}/pdf/",
    params(("id" = Uuid, Path, description = "Quiz session id")),
    responses(
        (status = 200, description = "PDF attachment", content_type = "application/pdf"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such quiz for this user")
    )
)]
pub async fn export_pdf_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = load_owned_session(&state, session_id, user_id).await?;

    let pdf = tokio::task::spawn_blocking(move || render_quiz_pdf(&session))
        .await
        .map_err(|e| e.to_string())
        .and_then(|rendered| rendered.map_err(|e| e.to_string()))
        .map_err(|e| {
            error!("Failed to render quiz PDF: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to render PDF".to_string(),
            )
        })?;

    let disposition = format!("attachment; filename=\"lets_prep_{}.pdf\"", session_id);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    ))
}

#[utoipa::path(
    post,
    path = "/session/{id}/rename/",
    params(("id" = Uuid, Path, description = "Quiz session id")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Renamed"),
        (status = 400, description = "Invalid title"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such quiz for this user")
    )
)]
pub async fn rename_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let title = validate_title(&req.title).map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    state
        .db
        .rename_quiz_session(session_id, user_id, &title)
        .await
        .map_err(|e| port_error_response("Failed to rename quiz session", e))?;

    Ok(Json(serde_json::json!({ "id": session_id, "title": title })))
}

#[utoipa::path(
    post,
    path = "/session/{id}/delete/",
    params(("id" = Uuid, Path, description = "Quiz session id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such quiz for this user")
    )
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_quiz_session(session_id, user_id)
        .await
        .map_err(|e| port_error_response("Failed to delete quiz session", e))?;

    info!("Deleted quiz session {}", session_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> QuizFormInput {
        QuizFormInput {
            title: Some("  Biology midterm ".to_string()),
            question_type: Some("MCQ".to_string()),
            num_questions: None,
            file: Some(("notes.txt".to_string(), Bytes::from_static(b"text"))),
        }
    }

    fn session(items: Vec<QuizItem>) -> QuizSession {
        QuizSession {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            source_file_id: None,
            title: "Quiz".to_string(),
            question_type: items[0].question_type(),
            created_at: Utc::now(),
            items,
        }
    }

    #[test]
    fn form_defaults_and_normalises() {
        let request = form().validate().unwrap();
        assert_eq!(request.title, "Biology midterm");
        assert_eq!(request.question_type, QuestionType::Mcq);
        assert_eq!(request.num_questions, DEFAULT_QUESTIONS);
        assert_eq!(request.file_name, "notes.txt");
    }

    #[test]
    fn form_rejects_bad_fields() {
        let mut blank_title = form();
        blank_title.title = Some("   ".to_string());
        assert!(blank_title.validate().is_err());

        let mut long_title = form();
        long_title.title = Some("t".repeat(MAX_TITLE_CHARS + 1));
        assert!(long_title.validate().is_err());

        let mut unknown_type = form();
        unknown_type.question_type = Some("essay".to_string());
        assert!(unknown_type.validate().is_err());

        for bad in ["0", "51", "ten"] {
            let mut count = form();
            count.num_questions = Some(bad.to_string());
            assert!(count.validate().is_err(), "accepted {}", bad);
        }

        let mut no_file = form();
        no_file.file = None;
        assert!(no_file.validate().is_err());
    }

    #[test]
    fn hidden_answers_stay_hidden() {
        let item = QuizItem::Mcq {
            prompt: "Pick one".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 2,
            explanation: "Because".to_string(),
        };

        let hidden = QuizItemDto::new(1, &item, false);
        assert_eq!(hidden.options.len(), 4);
        assert!(hidden.answer.is_none() && hidden.correct_option.is_none());
        assert!(hidden.explanation.is_none());

        let shown = QuizItemDto::new(1, &item, true);
        assert_eq!(shown.answer.as_deref(), Some("c"));
        assert_eq!(shown.correct_option.as_deref(), Some("C"));
        assert_eq!(shown.explanation.as_deref(), Some("Because"));
    }

    #[test]
    fn unanswered_items_count_as_wrong() {
        let quiz = session(vec![
            QuizItem::FillBlank {
                prompt: "The _____ is the powerhouse of the cell".to_string(),
                answer: "mitochondria".to_string(),
                explanation: String::new(),
            },
            QuizItem::FillBlank {
                prompt: "DNA is stored in the _____".to_string(),
                answer: "nucleus".to_string(),
                explanation: String::new(),
            },
        ]);

        let graded = grade_session(
            &quiz,
            vec![SubmittedAnswer {
                position: 1,
                response: " Mitochondria! ".to_string(),
            }],
        );
        assert!(graded.results[0].correct);
        assert!(!graded.results[1].correct);
        assert!(graded.results[1].response.is_none());
        assert_eq!((graded.score.correct, graded.score.total), (1, 2));
        assert_eq!(graded.score.percent, 50);
    }

    #[test]
    fn mcq_answers_accept_letters_and_numbers() {
        let quiz = session(vec![QuizItem::Mcq {
            prompt: "Which gas do plants release?".to_string(),
            options: vec!["Nitrogen".into(), "Oxygen".into(), "Helium".into(), "Argon".into()],
            correct_index: 1,
            explanation: String::new(),
        }]);

        for response in ["b", "2", "oxygen"] {
            let graded = grade_session(
                &quiz,
                vec![SubmittedAnswer {
                    position: 1,
                    response: response.to_string(),
                }],
            );
            assert!(graded.results[0].correct, "rejected {}", response);
            assert_eq!(graded.results[0].correct_option.as_deref(), Some("B"));
        }
    }
}
