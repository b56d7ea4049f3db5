//! HTTP front end for uploading and parsing documents.
//!
//! Endpoints:
//! - `GET /health`
//! - `POST /upload` (multipart `file` field)
//! - `GET /pdf/:id`, `GET /sheets/:id`, `GET /slides/:id`
//! - `POST /parse/:id?page=&sheet=&slide=&refine=` with optional JSON
//!   provider overrides

mod handlers;
mod routes;

pub use handlers::parse_error_status;
pub use routes::{cors_layer, create_router};

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::Settings;
use crate::parser::DocumentParser;
use crate::storage::DocumentStore;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub parser: Arc<DocumentParser>,
    pub allowed_origins: Arc<Vec<String>>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(settings: &Settings, parser: DocumentParser) -> anyhow::Result<Self> {
        let store = DocumentStore::open(&settings.documents_dir)?;
        Ok(Self {
            store: Arc::new(store),
            parser: Arc::new(parser),
            allowed_origins: Arc::new(settings.allowed_origins.clone()),
            max_upload_bytes: settings.max_upload_bytes,
        })
    }
}

/// Bind a listener. `host` may be a name as well as an address.
pub async fn bind_listener(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port)).await
}

/// Start the web server.
pub async fn serve(
    settings: &Settings,
    parser: DocumentParser,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let state = AppState::new(settings, parser)?;
    let app = create_router(state);

    let listener = bind_listener(host, port).await?;
    tracing::info!("Starting server at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::extract::office_fixtures::{pptx, xlsx};
    use crate::extract::pdf_fixtures::pdf;
    use crate::extract::PdfExtractor;
    use crate::llm::{LlmClient, LlmConfig};

    fn setup_test_app() -> (axum::Router, Arc<DocumentStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().to_path_buf());
        let parser = DocumentParser::new(
            LlmConfig::default(),
            PdfExtractor::raw_only(),
            LlmClient::new(),
        );
        let state = AppState::new(&settings, parser).unwrap();
        let store = state.store.clone();
        (create_router(state), store, dir)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _store, _dir) = setup_test_app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_upload_pdf_reports_pages() {
        let (app, store, _dir) = setup_test_app();
        let boundary = "XBOUNDARY";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"doc.pdf\"\r\n\
                 Content-Type: application/pdf\r\n\r\n",
                b = boundary
            )
            .as_bytes(),
        );
        body.extend_from_slice(&pdf(&["one", "two", "three"]));
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["page_count"], 3);
        assert_eq!(json["filename"], "doc.pdf");
        assert_eq!(json["extension"], ".pdf");
        assert!(store.load(json["id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let (app, _store, _dir) = setup_test_app();
        let body = "--B\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--B--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=B")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_csv() {
        let (app, store, _dir) = setup_test_app();
        let record = store.save("data.csv", Some("text/csv"), b"a,b\n1,2").unwrap();

        let response = app
            .oneshot(post(&format!("/parse/{}", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["markdown"], "| a | b |\n| --- | --- |\n| 1 | 2 |");
        assert_eq!(json["page"], serde_json::Value::Null);
        assert_eq!(json["refined"], false);
    }

    #[tokio::test]
    async fn test_parse_pdf_page() {
        let (app, store, _dir) = setup_test_app();
        let record = store
            .save("doc.pdf", Some("application/pdf"), &pdf(&["one", "two"]))
            .unwrap();

        let response = app
            .clone()
            .oneshot(post(&format!("/parse/{}?page=2", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["markdown"], "## Page 2\n\ntwo");
        assert_eq!(json["page"], 2);

        let response = app
            .oneshot(post(&format!("/parse/{}?page=3", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_rejects_zero_page() {
        let (app, store, _dir) = setup_test_app();
        let record = store.save("doc.pdf", None, &pdf(&["one"])).unwrap();
        let response = app
            .oneshot(post(&format!("/parse/{}?page=0", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_unknown_document() {
        let (app, _store, _dir) = setup_test_app();
        let response = app.oneshot(post("/parse/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Document not found");
    }

    #[tokio::test]
    async fn test_bind_listener_resolves_hostnames() {
        let listener = bind_listener("localhost", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_parse_empty_text_is_unprocessable() {
        let (app, store, _dir) = setup_test_app();
        let record = store.save("empty.txt", Some("text/plain"), b"").unwrap();
        let response = app
            .oneshot(post(&format!("/parse/{}", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_refine_disabled_is_bad_request() {
        let (app, store, _dir) = setup_test_app();
        let record = store.save("notes.txt", Some("text/plain"), b"hello").unwrap();
        let request = Request::builder()
            .method("POST")
            .uri(format!("/parse/{}?refine=true", record.id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"provider": "bedrock"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("LLM is disabled."));
    }

    #[tokio::test]
    async fn test_sheets_and_slides() {
        let (app, store, _dir) = setup_test_app();
        let book = store
            .save("book.xlsx", None, &xlsx(&[("One", &[&["1"]]), ("Two", &[&["2"]])]))
            .unwrap();
        let deck = store
            .save("deck.pptx", None, &pptx(&[&["a"], &["b"]]))
            .unwrap();

        let response = app
            .clone()
            .oneshot(get(&format!("/sheets/{}", book.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["sheets"], serde_json::json!(["One", "Two"]));

        let response = app
            .clone()
            .oneshot(get(&format!("/slides/{}", deck.id)))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["slides"], serde_json::json!([1, 2]));

        let response = app
            .oneshot(get(&format!("/sheets/{}", deck.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_pdf() {
        let (app, store, _dir) = setup_test_app();
        let bytes = pdf(&["x"]);
        let record = store.save("doc.pdf", None, &bytes).unwrap();
        let text = store.save("notes.txt", None, b"x").unwrap();

        let response = app
            .clone()
            .oneshot(get(&format!("/pdf/{}", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), bytes.as_slice());

        let response = app
            .oneshot(get(&format!("/pdf/{}", text.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
