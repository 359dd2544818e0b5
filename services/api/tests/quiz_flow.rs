mod common;

use axum::http::{header, StatusCode};
use common::{
    body_bytes, body_json, get, json_request, post, MultipartForm, TestApp, STUDY_NOTES,
};
use serde_json::{json, Value};
use std::io::Cursor;
use uuid::Uuid;

fn positions_and_answers(detail: &Value, field: &str) -> Vec<Value> {
    detail["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| json!({ "position": item["position"], "response": item[field] }))
        .collect()
}

#[tokio::test]
async fn uploading_notes_creates_a_quiz() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;

    let response = app
        .upload(&cookie, "  Biology ", "mcq", "notes.txt", STUDY_NOTES.as_bytes())
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = body_json(response).await;
    assert_eq!(created["title"], "Biology");
    assert_eq!(created["question_type"], "mcq");
    let item_count = created["item_count"].as_u64().unwrap();
    assert!((1..=5).contains(&item_count));

    let profile = body_json(app.send(get("/profile/", Some(&cookie))).await).await;
    assert_eq!(profile["quiz_count"], 1);
    assert_eq!(profile["upload_count"], 1);
}

#[tokio::test]
async fn answers_stay_hidden_until_revealed() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;
    let id = app.create_quiz(&cookie, "Cells").await;

    let hidden = body_json(app.send(get(&format!("/quiz/{}/", id), Some(&cookie))).await).await;
    assert_eq!(hidden["revealed"], false);
    assert_eq!(hidden["question_type_label"], "Flashcards");
    for item in hidden["items"].as_array().unwrap() {
        assert!(item["answer"].is_null());
        assert!(!item["prompt"].as_str().unwrap().is_empty());
    }

    let shown = body_json(
        app.send(get(&format!("/quiz/{}/?reveal=true", id), Some(&cookie)))
            .await,
    )
    .await;
    assert_eq!(shown["revealed"], true);
    let items = shown["items"].as_array().unwrap();
    assert_eq!(items[0]["position"], 1);
    for item in items {
        assert!(!item["answer"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn revealed_answers_score_full_marks() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;

    let created = body_json(
        app.upload(&cookie, "Energy", "mcq", "notes.txt", STUDY_NOTES.as_bytes())
            .await,
    )
    .await;
    let id = created["session_id"].as_str().unwrap().to_string();

    let shown = body_json(
        app.send(get(&format!("/quiz/{}/?reveal=true", id), Some(&cookie)))
            .await,
    )
    .await;
    for item in shown["items"].as_array().unwrap() {
        assert_eq!(item["options"].as_array().unwrap().len(), 4);
    }
    let answers = positions_and_answers(&shown, "correct_option");

    let checked = body_json(
        app.send(json_request(
            "POST",
            &format!("/quiz/{}/check/", id),
            Some(&cookie),
            json!({ "answers": answers }),
        ))
        .await,
    )
    .await;
    assert_eq!(checked["score"]["percent"], 100);
    assert_eq!(checked["score"]["correct"], checked["score"]["total"]);
}

#[tokio::test]
async fn unanswered_items_count_as_wrong() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;
    let id = app.create_quiz(&cookie, "Cells").await;

    let shown = body_json(
        app.send(get(&format!("/quiz/{}/?reveal=true", id), Some(&cookie)))
            .await,
    )
    .await;
    let total = shown["items"].as_array().unwrap().len();
    let first_only: Vec<Value> = positions_and_answers(&shown, "answer")
        .into_iter()
        .take(1)
        .collect();

    let checked = body_json(
        app.send(json_request(
            "POST",
            &format!("/quiz/{}/check/", id),
            Some(&cookie),
            json!({ "answers": first_only }),
        ))
        .await,
    )
    .await;
    assert!(total > 1);
    assert_eq!(checked["score"]["correct"], 1);
    assert_eq!(checked["score"]["total"], total);
    assert!(checked["results"][total - 1]["response"].is_null());
    assert_eq!(checked["results"][total - 1]["correct"], false);
}

#[tokio::test]
async fn quiz_exports_as_a_pdf_attachment() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;
    let id = app.create_quiz(&cookie, "Printable").await;

    let response = app.send(get(&format!("/quiz/{}/pdf/", id), Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap(),
        format!("attachment; filename=\"lets_prep_{}.pdf\"", id)
    );
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn history_lists_own_sessions_newest_first() {
    let app = TestApp::new();
    let alice = app.signup("alice").await;
    let bob = app.signup("bob").await;

    let mut ids = Vec::new();
    for n in 0..6 {
        ids.push(app.create_quiz(&alice, &format!("Quiz {}", n)).await);
    }
    app.create_quiz(&bob, "Bob's quiz").await;

    let history = body_json(app.send(get("/history/", Some(&alice))).await).await;
    let listed: Vec<Uuid> = history["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().parse().unwrap())
        .collect();
    let newest_first: Vec<Uuid> = ids.iter().rev().copied().collect();
    assert_eq!(listed, newest_first);

    let dashboard = body_json(app.send(get("/dashboard/", Some(&alice))).await).await;
    let recent = dashboard["recent_sessions"].as_array().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0]["title"], "Quiz 5");
}

#[tokio::test]
async fn other_users_sessions_are_not_found() {
    let app = TestApp::new();
    let owner = app.signup("owner").await;
    let intruder = app.signup("intruder").await;
    let id = app.create_quiz(&owner, "Private").await;

    let detail = app.send(get(&format!("/quiz/{}/", id), Some(&intruder))).await;
    assert_eq!(detail.status(), StatusCode::NOT_FOUND);

    let pdf = app.send(get(&format!("/quiz/{}/pdf/", id), Some(&intruder))).await;
    assert_eq!(pdf.status(), StatusCode::NOT_FOUND);

    let check = app
        .send(json_request(
            "POST",
            &format!("/quiz/{}/check/", id),
            Some(&intruder),
            json!({ "answers": [] }),
        ))
        .await;
    assert_eq!(check.status(), StatusCode::NOT_FOUND);

    let rename = app
        .send(json_request(
            "POST",
            &format!("/session/{}/rename/", id),
            Some(&intruder),
            json!({ "title": "Mine now" }),
        ))
        .await;
    assert_eq!(rename.status(), StatusCode::NOT_FOUND);

    let delete = app
        .send(post(&format!("/session/{}/delete/", id), Some(&intruder)))
        .await;
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);

    let still_there = app.send(get(&format!("/quiz/{}/", id), Some(&owner))).await;
    assert_eq!(still_there.status(), StatusCode::OK);
    let body = body_json(still_there).await;
    assert_eq!(body["title"], "Private");
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;

    let response = app
        .send(get(&format!("/quiz/{}/", Uuid::new_v4()), Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unsupported_files_are_rejected() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;

    let response = app
        .upload(&cookie, "Binary", "mcq", "notes.exe", b"MZ\x90\x00")
        .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let profile = body_json(app.send(get("/profile/", Some(&cookie))).await).await;
    assert_eq!(profile["upload_count"], 0);
}

#[tokio::test]
async fn invalid_forms_are_rejected() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;

    let blank_title = app
        .upload(&cookie, "   ", "mcq", "notes.txt", STUDY_NOTES.as_bytes())
        .await;
    assert_eq!(blank_title.status(), StatusCode::BAD_REQUEST);

    let bad_type = app
        .upload(&cookie, "Notes", "essay", "notes.txt", STUDY_NOTES.as_bytes())
        .await;
    assert_eq!(bad_type.status(), StatusCode::BAD_REQUEST);

    let too_many = MultipartForm::new()
        .text("title", "Notes")
        .text("question_type", "mcq")
        .text("num_questions", "51")
        .file("file", "notes.txt", STUDY_NOTES.as_bytes());
    let response = app.send(too_many.into_request("/new-quiz/", &cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let no_file = MultipartForm::new()
        .text("title", "Notes")
        .text("question_type", "mcq");
    let response = app.send(no_file.into_request("/new-quiz/", &cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_and_image_uploads_are_unprocessable() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;

    let blank = app
        .upload(&cookie, "Blank", "flashcard", "blank.txt", b"   \n\t ")
        .await;
    assert_eq!(blank.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut png = Vec::new();
    image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]))
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    let photo = app
        .upload(&cookie, "Photo", "flashcard", "page.png", &png)
        .await;
    assert_eq!(photo.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn uploads_without_usable_sentences_are_not_kept() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;

    let response = app
        .upload(&cookie, "Symbols", "mcq", "symbols.txt", b"--- *** ... ### !!! ???")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let profile = body_json(app.send(get("/profile/", Some(&cookie))).await).await;
    assert_eq!(profile["upload_count"], 0);
    assert_eq!(profile["quiz_count"], 0);
    assert_eq!(app.stored_files(), 0);

    app.create_quiz(&cookie, "Real notes").await;
    assert_eq!(app.stored_files(), 1);
}

#[tokio::test]
async fn sessions_can_be_renamed_and_deleted() {
    let app = TestApp::new();
    let cookie = app.signup("student").await;
    let id = app.create_quiz(&cookie, "Draft").await;

    let renamed = app
        .send(json_request(
            "POST",
            &format!("/session/{}/rename/", id),
            Some(&cookie),
            json!({ "title": "  Final review  " }),
        ))
        .await;
    assert_eq!(renamed.status(), StatusCode::OK);
    assert_eq!(body_json(renamed).await["title"], "Final review");

    let empty_title = app
        .send(json_request(
            "POST",
            &format!("/session/{}/rename/", id),
            Some(&cookie),
            json!({ "title": "" }),
        ))
        .await;
    assert_eq!(empty_title.status(), StatusCode::BAD_REQUEST);

    let history = body_json(app.send(get("/history/", Some(&cookie))).await).await;
    assert_eq!(history["sessions"][0]["title"], "Final review");

    let deleted = app
        .send(post(&format!("/session/{}/delete/", id), Some(&cookie)))
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app.send(get(&format!("/quiz/{}/", id), Some(&cookie))).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let profile = body_json(app.send(get("/profile/", Some(&cookie))).await).await;
    assert_eq!(profile["quiz_count"], 0);
    assert_eq!(profile["upload_count"], 1);
}
