//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use lets_prep_core::ports::{
    DatabaseService, FileStorageService, QuizGenerationService, TextExtractionService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub storage: Arc<dyn FileStorageService>,
    pub extractor: Arc<dyn TextExtractionService>,
    pub generator: Arc<dyn QuizGenerationService>,
}
