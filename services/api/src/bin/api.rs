//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, DocumentExtractor, LocalFileStore, OpenAiOcrAdapter, OpenAiQuizAdapter,
    },
    config::Config,
    error::ApiError,
    web::{router, ApiDoc, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use lets_prep_core::{
    generator::HeuristicQuizGenerator,
    ports::{OcrService, QuizGenerationService},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    // OpenAI-backed adapters are optional; without a key, image uploads are
    // rejected and questions come from the heuristic generator.
    let openai_client = config
        .openai_api_key
        .as_ref()
        .map(|key| Client::with_config(OpenAIConfig::new().with_api_key(key)));

    let ocr_adapter: Option<Arc<dyn OcrService>> = openai_client.as_ref().map(|client| {
        Arc::new(OpenAiOcrAdapter::new(client.clone(), config.ocr_model.clone()))
            as Arc<dyn OcrService>
    });
    if ocr_adapter.is_none() {
        warn!("OPENAI_API_KEY is not set; image uploads will be rejected.");
    }

    let generator: Arc<dyn QuizGenerationService> = match (&openai_client, config.use_ai_questions) {
        (Some(client), true) => {
            info!("Using AI question generation with model {}", config.ai_model_name);
            Arc::new(OpenAiQuizAdapter::new(
                client.clone(),
                config.ai_model_name.clone(),
            ))
        }
        (None, true) => {
            warn!("USE_AI_QUESTIONS is set but OPENAI_API_KEY is missing; using heuristic generation.");
            Arc::new(HeuristicQuizGenerator::new())
        }
        (_, false) => Arc::new(HeuristicQuizGenerator::new()),
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        storage: Arc::new(LocalFileStore::new(config.upload_dir.clone())),
        extractor: Arc::new(DocumentExtractor::new(ocr_adapter)),
        generator,
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
