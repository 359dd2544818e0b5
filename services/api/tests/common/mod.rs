//! Shared fixtures for the HTTP-level tests: an in-memory `DatabaseService`,
//! a router wired with the real extractor, generator and a temp-dir file store,
//! and small request/response helpers.

#![allow(dead_code)]

use api_lib::{
    adapters::{DocumentExtractor, LocalFileStore},
    config::Config,
    web::{router, AppState},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use lets_prep_core::{
    domain::{
        NewQuizSession, NewUploadedFile, QuizSession, QuizSessionSummary, UploadedFile, User,
        UserCredentials,
    },
    generator::HeuristicQuizGenerator,
    ports::{DatabaseService, PortError, PortResult},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// In-Memory Database
//=========================================================================================

#[derive(Default)]
struct Store {
    users: Vec<(UserCredentials, DateTime<Utc>)>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    files: Vec<UploadedFile>,
    sessions: Vec<QuizSession>,
}

#[derive(Default)]
pub struct InMemoryDb {
    store: Mutex<Store>,
}

impl InMemoryDb {
    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        let mut store = self.lock()?;
        if store.users.iter().any(|(u, _)| u.username == username) {
            return Err(PortError::Conflict(format!("username '{}' taken", username)));
        }
        let creds = UserCredentials {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        let created_at = Utc::now();
        store.users.push((creds.clone(), created_at));
        Ok(User {
            user_id: creds.user_id,
            username: creds.username,
            created_at,
        })
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let store = self.lock()?;
        store
            .users
            .iter()
            .find(|(u, _)| u.user_id == user_id)
            .map(|(u, created_at)| User {
                user_id: u.user_id,
                username: u.username.clone(),
                created_at: *created_at,
            })
            .ok_or_else(|| PortError::NotFound(format!("user {}", user_id)))
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials> {
        let store = self.lock()?;
        store
            .users
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(format!("user '{}'", username)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.lock()?
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.lock()?.auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.lock()?.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn create_uploaded_file(&self, file: NewUploadedFile) -> PortResult<UploadedFile> {
        let uploaded = UploadedFile {
            id: Uuid::new_v4(),
            owner_id: file.owner_id,
            original_name: file.original_name,
            storage_path: file.storage_path,
            format: file.format,
            text_excerpt: file.text_excerpt,
            created_at: Utc::now(),
        };
        self.lock()?.files.push(uploaded.clone());
        Ok(uploaded)
    }

    async fn get_uploaded_file(&self, file_id: Uuid) -> PortResult<UploadedFile> {
        self.lock()?
            .files
            .iter()
            .find(|f| f.id == file_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("file {}", file_id)))
    }

    async fn count_uploaded_files(&self, owner_id: Uuid) -> PortResult<usize> {
        Ok(self
            .lock()?
            .files
            .iter()
            .filter(|f| f.owner_id == owner_id)
            .count())
    }

    async fn create_quiz_session(&self, session: NewQuizSession) -> PortResult<QuizSession> {
        let created = QuizSession {
            id: Uuid::new_v4(),
            owner_id: session.owner_id,
            source_file_id: session.source_file_id,
            title: session.title,
            question_type: session.question_type,
            created_at: Utc::now(),
            items: session.items,
        };
        self.lock()?.sessions.push(created.clone());
        Ok(created)
    }

    async fn get_quiz_session(&self, session_id: Uuid) -> PortResult<QuizSession> {
        self.lock()?
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("quiz session {}", session_id)))
    }

    async fn list_quiz_sessions(
        &self,
        owner_id: Uuid,
        limit: Option<usize>,
    ) -> PortResult<Vec<QuizSessionSummary>> {
        let store = self.lock()?;
        // Newest first; insertion order breaks timestamp ties.
        let mut owned: Vec<&QuizSession> = store
            .sessions
            .iter()
            .rev()
            .filter(|s| s.owner_id == owner_id)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(QuizSessionSummary::from)
            .collect())
    }

    async fn rename_quiz_session(
        &self,
        session_id: Uuid,
        owner_id: Uuid,
        title: &str,
    ) -> PortResult<()> {
        let mut store = self.lock()?;
        let session = store
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.owner_id == owner_id)
            .ok_or_else(|| PortError::NotFound(format!("quiz session {}", session_id)))?;
        session.title = title.to_string();
        Ok(())
    }

    async fn delete_quiz_session(&self, session_id: Uuid, owner_id: Uuid) -> PortResult<()> {
        let mut store = self.lock()?;
        let before = store.sessions.len();
        store
            .sessions
            .retain(|s| !(s.id == session_id && s.owner_id == owner_id));
        if store.sessions.len() == before {
            return Err(PortError::NotFound(format!("quiz session {}", session_id)));
        }
        Ok(())
    }
}

//=========================================================================================
// Test Application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    _uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused/test".to_string()),
            "UPLOAD_DIR" => Some(uploads.path().display().to_string()),
            _ => None,
        })
        .unwrap();

        let db = Arc::new(InMemoryDb::default());
        let state = Arc::new(AppState {
            db: db.clone(),
            config: Arc::new(config.clone()),
            storage: Arc::new(LocalFileStore::new(config.upload_dir.clone())),
            extractor: Arc::new(DocumentExtractor::new(None)),
            generator: Arc::new(HeuristicQuizGenerator::new()),
        });

        Self {
            router: router(state),
            db,
            _uploads: uploads,
        }
    }

    /// Counts the files written under the upload directory, one level of owner folders deep.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self._uploads.path())
            .unwrap()
            .map(|owner| std::fs::read_dir(owner.unwrap().path()).unwrap().count())
            .sum()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Signs a new user up and returns the `session=...` cookie pair.
    pub async fn signup(&self, username: &str) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/signup/",
                None,
                serde_json::json!({ "username": username, "password": "correct horse battery" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        session_cookie(&response)
    }

    /// Posts the new-quiz form with `bytes` uploaded as `file_name`.
    pub async fn upload(
        &self,
        cookie: &str,
        title: &str,
        question_type: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Response<Body> {
        let form = MultipartForm::new()
            .text("title", title)
            .text("question_type", question_type)
            .text("num_questions", "5")
            .file("file", file_name, bytes);
        self.send(form.into_request("/new-quiz/", cookie)).await
    }

    pub async fn create_quiz(&self, cookie: &str, title: &str) -> Uuid {
        let response = self
            .upload(cookie, title, "flashcard", "notes.txt", STUDY_NOTES.as_bytes())
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        body["session_id"].as_str().unwrap().parse().unwrap()
    }
}

pub const STUDY_NOTES: &str = "Photosynthesis is the process plants use to turn light into chemical energy. \
Chlorophyll is the pigment that absorbs light in the chloroplast. \
Cellular respiration releases energy stored in glucose. \
Mitochondria are the organelles where most respiration takes place. \
Osmosis is the movement of water across a semi-permeable membrane.";

//=========================================================================================
// Request and Response Helpers
//=========================================================================================

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// The `session=<id>` pair from a `Set-Cookie` response header.
pub fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

const BOUNDARY: &str = "lets-prep-test-boundary";

/// A minimal multipart/form-data body builder.
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str, cookie: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(self.body))
            .unwrap()
    }
}
