use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::io::{Cursor, Write};
use std::sync::Arc;
use template_service::config::{
    MongoConfig, RendererConfig, StorageBackend, StorageConfig, TemplateConfig,
};
use template_service::startup::{build_router, AppState, Backends};
use template_service::templating::{HtmlToPdfRenderer, TemplateError};
use tokio::net::TcpListener;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const ADMIN_ID: &str = "admin-1";
pub const PROFESSOR_ID: &str = "prof-1";
pub const COLLABORATOR_ID: &str = "colab-1";

pub const FAKE_PDF: &[u8] = b"%PDF-1.7 fake";

/// Stands in for the headless browser.
pub struct FakePdfRenderer;

#[async_trait]
impl HtmlToPdfRenderer for FakePdfRenderer {
    async fn render(&self, _html: &str) -> Result<Vec<u8>, TemplateError> {
        Ok(FAKE_PDF.to_vec())
    }
}

pub struct TestApp {
    pub address: String,
    pub client: Client,
}

/// Caller identity sent with a request: user id and role header value.
#[derive(Clone, Copy)]
pub struct As<'a>(pub &'a str, pub &'a str);

pub const ADMIN: As<'static> = As(ADMIN_ID, "administrator");
pub const PROFESSOR: As<'static> = As(PROFESSOR_ID, "professor");
pub const COLLABORATOR: As<'static> = As(COLLABORATOR_ID, "colaborador");

fn test_config() -> TemplateConfig {
    TemplateConfig {
        common: CoreConfig {
            port: 0,
            log_level: "info".to_string(),
            otlp_endpoint: None,
        },
        mongodb: MongoConfig {
            uri: String::new(),
            database: "template_test".to_string(),
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            local_path: "storage".to_string(),
        },
        renderer: RendererConfig {
            program: "fake".to_string(),
            args: Vec::new(),
            timeout_secs: 30,
            temp_dir: std::env::temp_dir().to_string_lossy().into_owned(),
        },
        max_upload_bytes: 1024 * 1024,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let state = AppState::new(
            test_config(),
            Backends::in_memory(Arc::new(FakePdfRenderer)),
        );
        let app = build_router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            client: Client::new(),
        }
    }

    fn with_identity(&self, builder: RequestBuilder, who: As<'_>) -> RequestBuilder {
        builder.header("X-User-ID", who.0).header("X-User-Role", who.1)
    }

    pub fn get(&self, path: &str, who: As<'_>) -> RequestBuilder {
        self.with_identity(self.client.get(format!("{}{}", self.address, path)), who)
    }

    pub fn post(&self, path: &str, who: As<'_>) -> RequestBuilder {
        self.with_identity(self.client.post(format!("{}{}", self.address, path)), who)
    }

    pub fn put(&self, path: &str, who: As<'_>) -> RequestBuilder {
        self.with_identity(self.client.put(format!("{}{}", self.address, path)), who)
    }

    pub fn delete(&self, path: &str, who: As<'_>) -> RequestBuilder {
        self.with_identity(self.client.delete(format!("{}{}", self.address, path)), who)
    }

    /// Grants document and layout access to professors and collaborators for
    /// `user_id`, with layout edit and upload for professors.
    pub async fn grant_defaults(&self, user_id: &str) {
        let response = self
            .put(&format!("/permissions/{}", user_id), ADMIN)
            .json(&json!({
                "can_access_documents": true,
                "document_view_roles": ["professor", "collaborator"],
                "document_edit_roles": ["professor"],
                "document_upload_roles": ["professor"],
                "layout_view_roles": ["2", "3"],
                "layout_edit_roles": ["professor"],
                "layout_upload_roles": ["professor"]
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert!(response.status().is_success(), "grant failed: {}", response.status());
    }

    pub async fn upload_layout(&self, who: As<'_>, name: &str, document: Vec<u8>) -> Response {
        let form = multipart::Form::new()
            .text("name", name.to_string())
            .text("description", "Uploaded by tests")
            .part(
                "file",
                multipart::Part::bytes(document)
                    .file_name(format!("{}.docx", name))
                    .mime_str(
                        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                    )
                    .unwrap(),
            );

        self.post("/layouts", who)
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Uploads a layout as a professor and returns its JSON body.
    pub async fn create_layout(&self, name: &str, paragraphs: &[&str]) -> Value {
        let response = self
            .upload_layout(PROFESSOR, name, docx(paragraphs))
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse JSON")
    }
}

/// A minimal DOCX with one paragraph and one run per entry.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|text| {
            format!(
                r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                text.replace('&', "&amp;").replace('<', "&lt;")
            )
        })
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(br#"<?xml version="1.0"?><Types/>"#).unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(document.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// The main document part of a generated DOCX.
pub fn docx_xml(bytes: &[u8]) -> String {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("Not a ZIP archive");
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .expect("Missing document part")
        .read_to_string(&mut xml)
        .unwrap();
    xml
}
