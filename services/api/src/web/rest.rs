//! services/api/src/web/rest.rs
//!
//! Contains the account-level REST handlers (landing page, dashboard, history,
//! profile), the payloads shared by the web layer, the mapping from port errors
//! to HTTP responses, and the master definition for the OpenAPI specification.

use crate::web::{auth, quiz, state::AppState};
use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use lets_prep_core::{
    domain::QuizSessionSummary,
    ports::{ExtractionError, PortError},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

/// Number of sessions shown on the dashboard.
pub const DASHBOARD_SESSIONS: usize = 5;

const SERVICE_NAME: &str = "Let's Prep";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        home_handler,
        dashboard_handler,
        history_handler,
        profile_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        quiz::new_quiz_handler,
        quiz::quiz_detail_handler,
        quiz::check_answers_handler,
        quiz::export_pdf_handler,
        quiz::rename_session_handler,
        quiz::delete_session_handler,
    ),
    components(
        schemas(
            HomeResponse,
            SessionSummaryDto,
            DashboardResponse,
            HistoryResponse,
            ProfileResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            quiz::QuizCreatedResponse,
            quiz::QuizItemDto,
            quiz::QuizDetailResponse,
            quiz::SubmittedAnswer,
            quiz::CheckAnswersRequest,
            quiz::ItemResult,
            quiz::ScoreDto,
            quiz::CheckAnswersResponse,
            quiz::RenameRequest,
        )
    ),
    tags(
        (name = "Let's Prep API", description = "Upload study notes and practise with generated quizzes.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a port failure onto the coarse status codes users see. Unexpected
/// failures are logged and reported without detail.
pub fn port_error_response(context: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found".to_string()),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unexpected(msg) => {
            error!("{}: {}", context, msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

pub fn extraction_error_response(e: ExtractionError) -> (StatusCode, String) {
    warn!("Text extraction failed: {}", e);
    let status = match e {
        ExtractionError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ExtractionError::CorruptFile(_)
        | ExtractionError::NoText
        | ExtractionError::OcrUnavailable
        | ExtractionError::OcrFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string())
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HomeResponse {
    pub service: String,
    pub logged_in: bool,
    pub username: Option<String>,
}

/// One row of a session listing.
#[derive(Serialize, ToSchema)]
pub struct SessionSummaryDto {
    pub id: Uuid,
    pub title: String,
    pub question_type: String,
    pub question_type_label: String,
    pub item_count: usize,
    pub source_file_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<QuizSessionSummary> for SessionSummaryDto {
    fn from(summary: QuizSessionSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            question_type: summary.question_type.as_str().to_string(),
            question_type_label: summary.question_type.label().to_string(),
            item_count: summary.item_count,
            source_file_id: summary.source_file_id,
            created_at: summary.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    pub username: String,
    pub recent_sessions: Vec<SessionSummaryDto>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub sessions: Vec<SessionSummaryDto>,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub username: String,
    pub joined_at: DateTime<Utc>,
    pub quiz_count: usize,
    pub upload_count: usize,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Landing information; reports whether the caller holds a valid session.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = HomeResponse)
    )
)]
pub async fn home_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<HomeResponse> {
    let mut username = None;
    if let Some(auth_session_id) = auth::session_id_from_headers(&headers) {
        if let Ok(user_id) = state.db.validate_auth_session(auth_session_id).await {
            username = state.db.get_user_by_id(user_id).await.ok().map(|u| u.username);
        }
    }

    Json(HomeResponse {
        service: SERVICE_NAME.to_string(),
        logged_in: username.is_some(),
        username,
    })
}

/// The caller's most recent quiz sessions.
#[utoipa::path(
    get,
    path = "/dashboard/",
    responses(
        (status = 200, description = "Recent sessions, newest first", body = DashboardResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .db
        .get_user_by_id(user_id)
        .await
        .map_err(|e| port_error_response("Failed to load user", e))?;
    let sessions = state
        .db
        .list_quiz_sessions(user_id, Some(DASHBOARD_SESSIONS))
        .await
        .map_err(|e| port_error_response("Failed to list quiz sessions", e))?;

    Ok(Json(DashboardResponse {
        username: user.username,
        recent_sessions: sessions.into_iter().map(SessionSummaryDto::from).collect(),
    }))
}

/// Every quiz session owned by the caller, newest first.
#[utoipa::path(
    get,
    path = "/history/",
    responses(
        (status = 200, description = "All sessions, newest first", body = HistoryResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sessions = state
        .db
        .list_quiz_sessions(user_id, None)
        .await
        .map_err(|e| port_error_response("Failed to list quiz sessions", e))?;

    Ok(Json(HistoryResponse {
        sessions: sessions.into_iter().map(SessionSummaryDto::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/profile/",
    responses(
        (status = 200, description = "Account details and activity counts", body = ProfileResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .db
        .get_user_by_id(user_id)
        .await
        .map_err(|e| port_error_response("Failed to load user", e))?;
    let quiz_count = state
        .db
        .list_quiz_sessions(user_id, None)
        .await
        .map_err(|e| port_error_response("Failed to list quiz sessions", e))?
        .len();
    let upload_count = state
        .db
        .count_uploaded_files(user_id)
        .await
        .map_err(|e| port_error_response("Failed to count uploads", e))?;

    Ok(Json(ProfileResponse {
        user_id: user.user_id,
        username: user.username,
        joined_at: user.created_at,
        quiz_count,
        upload_count,
    }))
}
