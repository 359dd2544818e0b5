pub mod auth;
pub mod middleware;
pub mod quiz;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Builds every application route. CORS and the Swagger UI are layered on by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(rest::home_handler))
        .route("/signup/", post(auth::signup_handler))
        .route("/accounts/login/", post(auth::login_handler))
        .route("/accounts/logout/", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/dashboard/", get(rest::dashboard_handler))
        .route("/history/", get(rest::history_handler))
        .route("/profile/", get(rest::profile_handler))
        .route("/new-quiz/", post(quiz::new_quiz_handler))
        .route("/quiz/{id}/", get(quiz::quiz_detail_handler))
        .route("/quiz/{id}/check/", post(quiz::check_answers_handler))
        .route("/quiz/{id}/pdf/", get(quiz::export_pdf_handler))
        .route("/session/{id}/rename/", post(quiz::rename_session_handler))
        .route("/session/{id}/delete/", post(quiz::delete_session_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
}
