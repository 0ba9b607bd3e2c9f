mod common;

use common::{
    docx_xml, As, TestApp, ADMIN, COLLABORATOR, COLLABORATOR_ID, FAKE_PDF, PROFESSOR,
    PROFESSOR_ID,
};
use serde_json::{json, Value};

async fn save_partial(app: &TestApp, layout_id: &str, body: Value) -> reqwest::Response {
    app.post(&format!("/layouts/{}/partials", layout_id), PROFESSOR)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

async fn complete(app: &TestApp, id: &str, who: As<'_>, body: Value) -> reqwest::Response {
    app.post(&format!("/partials/{}/complete", id), who)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

/// A layout with `nome` and `curso`, pre-filled with `nome` for professors.
async fn professor_partial(app: &TestApp) -> (String, String) {
    app.grant_defaults(PROFESSOR_ID).await;
    app.grant_defaults(COLLABORATOR_ID).await;
    let layout = app
        .create_layout("Declaração", &["Aluno: {{nome}}", "Curso: {{curso}}"])
        .await;
    let layout_id = layout["id"].as_str().unwrap().to_string();

    let response = save_partial(
        app,
        &layout_id,
        json!({
            "title": "Declaração de matrícula",
            "content": { "nome": "Ana" },
            "audience": "professor"
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 201);
    let partial: Value = response.json().await.unwrap();
    assert_eq!(partial["status"], "open");
    assert_eq!(partial["audience"], "professor");

    (layout_id, partial["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn audience_is_checked_before_fields() {
    let app = TestApp::spawn().await;
    let (_, id) = professor_partial(&app).await;

    let response = complete(&app, &id, COLLABORATOR, json!({ "values": {} })).await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "access_denied");
    assert!(body.get("missing").is_none());
}

#[tokio::test]
async fn incomplete_fields_are_named() {
    let app = TestApp::spawn().await;
    let (_, id) = professor_partial(&app).await;

    let response = complete(&app, &id, PROFESSOR, json!({ "values": {} })).await;
    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "unprocessable_entity");
    assert_eq!(body["missing"], json!(["curso"]));
}

#[tokio::test]
async fn complete_generates_artifact_without_mutating_record() {
    let app = TestApp::spawn().await;
    let (_, id) = professor_partial(&app).await;

    let response = complete(
        &app,
        &id,
        PROFESSOR,
        json!({ "values": { "curso": "Matemática", "nome": "Outro" }, "format": "docx" }),
    )
    .await;
    assert!(response.status().is_success());
    let xml = docx_xml(&response.bytes().await.unwrap());
    assert!(xml.contains("Aluno: Ana"));
    assert!(xml.contains("Curso: Matemática"));

    let response = complete(
        &app,
        &id,
        PROFESSOR,
        json!({ "values": { "curso": "História" }, "format": "pdf" }),
    )
    .await;
    assert!(response.status().is_success());
    assert_eq!(response.bytes().await.unwrap().as_ref(), FAKE_PDF);

    let partial: Value = app
        .get(&format!("/partials/{}", id), PROFESSOR)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(partial["content"], json!({ "nome": "Ana" }));
    assert_eq!(partial["status"], "open");
}

#[tokio::test]
async fn fully_filled_partial_is_complete() {
    let app = TestApp::spawn().await;
    app.grant_defaults(PROFESSOR_ID).await;
    let layout = app.create_layout("full", &["{{nome}} {{curso}}"]).await;

    let response = save_partial(
        &app,
        layout["id"].as_str().unwrap(),
        json!({
            "title": "Pronto",
            "content": { "nome": "Ana", "curso": "Física" },
            "audience": "everyone"
        }),
    )
    .await;
    let partial: Value = response.json().await.unwrap();
    assert_eq!(partial["status"], "complete");
}

#[tokio::test]
async fn invalid_audience_and_unknown_fields_are_rejected() {
    let app = TestApp::spawn().await;
    app.grant_defaults(PROFESSOR_ID).await;
    let layout = app.create_layout("checks", &["{{nome}}"]).await;
    let layout_id = layout["id"].as_str().unwrap();

    let response = save_partial(
        &app,
        layout_id,
        json!({ "title": "x", "content": {}, "audience": "students" }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = save_partial(
        &app,
        layout_id,
        json!({ "title": "x", "content": { "idade": "12" }, "audience": "everyone" }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("idade"));

    let response = save_partial(
        &app,
        layout_id,
        json!({ "title": "", "content": {}, "audience": "everyone" }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn list_respects_audience() {
    let app = TestApp::spawn().await;
    let (layout_id, professor_only) = professor_partial(&app).await;

    let response = save_partial(
        &app,
        &layout_id,
        json!({ "title": "Para todos", "content": {}, "audience": "everyone" }),
    )
    .await;
    let shared: Value = response.json().await.unwrap();

    let list: Value = app
        .get(&format!("/partials?layout_id={}", layout_id), COLLABORATOR)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["partial_templates"][0]["id"], shared["id"]);

    let list: Value = app
        .get("/partials", PROFESSOR)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 2);

    let list: Value = app
        .get("/partials", ADMIN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = list["partial_templates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&professor_only.as_str()));
}

#[tokio::test]
async fn preview_merges_author_and_completer_values() {
    let app = TestApp::spawn().await;
    let (_, id) = professor_partial(&app).await;

    let response = app
        .post(&format!("/partials/{}/preview", id), PROFESSOR)
        .json(&json!({ "values": { "curso": "Química" } }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let html = response.text().await.unwrap();
    assert!(html.contains("Aluno: Ana"));
    assert!(html.contains("Curso: Química"));
}

#[tokio::test]
async fn delete_requires_edit_and_removes_record() {
    let app = TestApp::spawn().await;
    let (_, id) = professor_partial(&app).await;

    let response = app
        .delete(&format!("/partials/{}", id), COLLABORATOR)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .delete(&format!("/partials/{}", id), PROFESSOR)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = complete(&app, &id, PROFESSOR, json!({ "values": {} })).await;
    assert_eq!(response.status().as_u16(), 404);
}
