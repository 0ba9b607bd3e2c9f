mod common;

use common::{TestApp, ADMIN, PROFESSOR, PROFESSOR_ID};
use serde_json::{json, Value};

#[tokio::test]
async fn only_administrators_manage_permissions() {
    let app = TestApp::spawn().await;

    let response = app
        .get(&format!("/permissions/{}", PROFESSOR_ID), PROFESSOR)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .put(&format!("/permissions/{}", PROFESSOR_ID), PROFESSOR)
        .json(&json!({ "can_access_documents": true, "layout_upload_roles": ["professor"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn saved_permissions_normalise_roles() {
    let app = TestApp::spawn().await;

    let response = app
        .put(&format!("/permissions/{}", PROFESSOR_ID), ADMIN)
        .json(&json!({
            "can_access_documents": true,
            "document_view_roles": ["1", "2", "colaborador"],
            "layout_view_roles": ["teacher"]
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: Value = app
        .get(&format!("/permissions/{}", PROFESSOR_ID), ADMIN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["can_access_documents"], true);
    assert_eq!(body["document_view_roles"], json!(["professor", "collaborator"]));
    assert_eq!(body["layout_view_roles"], json!(["professor"]));
    assert_eq!(body["layout_edit_roles"], json!([]));
}

#[tokio::test]
async fn unknown_roles_are_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .put(&format!("/permissions/{}", PROFESSOR_ID), ADMIN)
        .json(&json!({ "can_access_documents": true, "document_view_roles": ["student"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .get(&format!("/permissions/{}/restrictions/janitor", PROFESSOR_ID), ADMIN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn restrictions_toggle_set_and_reset() {
    let app = TestApp::spawn().await;
    let path = format!("/permissions/{}/restrictions/professor", PROFESSOR_ID);

    let body: Value = app
        .post(&format!("{}/toggle", path), ADMIN)
        .json(&json!({ "kind": "document", "id": "doc-1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["restricted"], true);
    assert_eq!(body["restricted_document_ids"], json!(["doc-1"]));

    let body: Value = app
        .post(&format!("{}/toggle", path), ADMIN)
        .json(&json!({ "kind": "document", "id": "doc-1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["restricted"], false);
    assert_eq!(body["restricted_document_ids"], json!([]));

    let body: Value = app
        .put(&path, ADMIN)
        .json(&json!({ "layouts": ["l1", "l2"], "documents": ["d1"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["restricted_layout_ids"], json!(["l1", "l2"]));
    assert!(body.get("restricted").is_none());

    let body: Value = app
        .delete(&path, ADMIN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["restricted_layout_ids"], json!([]));
    assert_eq!(body["restricted_document_ids"], json!([]));
}

#[tokio::test]
async fn switching_off_documents_denies_everything() {
    let app = TestApp::spawn().await;
    app.grant_defaults(PROFESSOR_ID).await;
    app.create_layout("before", &["{{a}}"]).await;

    let response = app
        .put(&format!("/permissions/{}", PROFESSOR_ID), ADMIN)
        .json(&json!({
            "can_access_documents": false,
            "layout_view_roles": ["professor"],
            "layout_upload_roles": ["professor"]
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let list: Value = app
        .get("/layouts", PROFESSOR)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 0);
}
