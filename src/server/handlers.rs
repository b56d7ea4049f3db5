//! HTTP request handlers.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use super::AppState;
use crate::extract::ExtractionError;
use crate::llm::{LlmError, LlmOverrides};
use crate::models::ExtractionSelector;
use crate::parser::ParseError;
use crate::storage::{StorageError, StoredDocument};

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Status code for a failed extraction or refinement.
pub fn parse_error_status(err: &ParseError) -> StatusCode {
    match err {
        ParseError::NotFound(_) => StatusCode::NOT_FOUND,
        ParseError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        ParseError::Extraction(e) => match e {
            ExtractionError::OutOfRange { .. } | ExtractionError::UnsupportedFormat(_) => {
                StatusCode::BAD_REQUEST
            }
            ExtractionError::NoTextExtracted => StatusCode::UNPROCESSABLE_ENTITY,
            ExtractionError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        ParseError::Refine(e) => match e {
            LlmError::Disabled | LlmError::Config(_) | LlmError::UnknownProvider(_) => {
                StatusCode::BAD_REQUEST
            }
            LlmError::Provider(_) => StatusCode::BAD_GATEWAY,
        },
    }
}

fn parse_error_response(err: ParseError) -> Response {
    let status = parse_error_status(&err);
    if status.is_server_error() {
        error!("request failed: {}", err);
    }
    error_json(status, err.to_string())
}

fn load_record(state: &AppState, doc_id: &str) -> Result<StoredDocument, Response> {
    state.store.load(doc_id).map_err(|e| match e {
        StorageError::NotFound(_) => error_json(StatusCode::NOT_FOUND, "Document not found"),
        other => {
            error!("failed to load {}: {}", doc_id, other);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    })
}

/// Run blocking extraction work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, ParseError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(parse_error_response),
        Err(e) => {
            error!("extraction task failed: {}", e);
            Err(error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Extraction task failed",
            ))
        }
    }
}

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub filename: String,
    pub page_count: u32,
    pub content_type: String,
    pub extension: String,
}

/// Accept a multipart upload in the `file` field.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_json(StatusCode::BAD_REQUEST, e.to_string()),
        };
        if field.name() != Some("file") {
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return error_json(StatusCode::BAD_REQUEST, "File name is required"),
        };
        let content_type = field.content_type().map(String::from);
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => return error_json(StatusCode::BAD_REQUEST, e.to_string()),
        };

        let store = state.store.clone();
        let parser = state.parser.clone();
        let result = tokio::task::spawn_blocking(move || {
            let record = store
                .save(&filename, content_type.as_deref(), &bytes)
                .map_err(|e| e.to_string())?;
            let page_count = parser
                .page_count(&record.reference())
                .map_err(|e| format!("Failed to read PDF: {}", e))?;
            Ok::<_, String>((record, page_count))
        })
        .await;

        return match result {
            Ok(Ok((record, page_count))) => {
                info!("uploaded {} as {}", record.filename, record.id);
                Json(UploadResponse {
                    id: record.id,
                    filename: record.filename,
                    page_count,
                    content_type: record.content_type,
                    extension: record.extension,
                })
                .into_response()
            }
            Ok(Err(msg)) => {
                error!("{}", msg);
                error_json(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
    }

    error_json(StatusCode::BAD_REQUEST, "Missing file field")
}

/// Stored PDF bytes.
pub async fn get_pdf(State(state): State<AppState>, Path(doc_id): Path<String>) -> Response {
    let record = match state.store.load(&doc_id) {
        Ok(record) if record.is_pdf() => record,
        _ => return error_json(StatusCode::NOT_FOUND, "PDF not found"),
    };

    match tokio::fs::read(&record.stored_path).await {
        Ok(content) => ([(header::CONTENT_TYPE, "application/pdf")], content).into_response(),
        Err(_) => error_json(StatusCode::NOT_FOUND, "PDF not found"),
    }
}

/// Worksheet names of a spreadsheet.
pub async fn get_sheets(State(state): State<AppState>, Path(doc_id): Path<String>) -> Response {
    let record = match load_record(&state, &doc_id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let parser = state.parser.clone();
    let doc = record.reference();
    match blocking(move || parser.list_sheets(&doc)).await {
        Ok(sheets) => Json(json!({ "id": record.id, "sheets": sheets })).into_response(),
        Err(resp) => resp,
    }
}

/// Slide numbers of a presentation.
pub async fn get_slides(State(state): State<AppState>, Path(doc_id): Path<String>) -> Response {
    let record = match load_record(&state, &doc_id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let parser = state.parser.clone();
    let doc = record.reference();
    match blocking(move || parser.list_slides(&doc)).await {
        Ok(slides) => Json(json!({ "id": record.id, "slides": slides })).into_response(),
        Err(resp) => resp,
    }
}

/// Query parameters for parsing.
#[derive(Debug, Default, Deserialize)]
pub struct ParseParams {
    pub page: Option<u32>,
    pub sheet: Option<String>,
    pub slide: Option<u32>,
    #[serde(default)]
    pub refine: bool,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub id: String,
    pub markdown: String,
    pub page: Option<u32>,
    pub sheet: Option<String>,
    pub slide: Option<u32>,
    pub refined: bool,
    pub content_type: String,
    pub extension: String,
}

/// Extract markdown, optionally refining it with the configured provider.
pub async fn parse(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Query(params): Query<ParseParams>,
    overrides: Option<Json<LlmOverrides>>,
) -> Response {
    if params.page == Some(0) {
        return error_json(StatusCode::BAD_REQUEST, "page must be >= 1");
    }
    if params.slide == Some(0) {
        return error_json(StatusCode::BAD_REQUEST, "slide must be >= 1");
    }

    let record = match load_record(&state, &doc_id) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let doc = record.reference();
    let selector = ExtractionSelector {
        page: params.page,
        sheet: params.sheet,
        slide: params.slide,
    };

    let parser = state.parser.clone();
    let extract_doc = doc.clone();
    let mut outcome = match blocking(move || parser.extract(&extract_doc, &selector)).await {
        Ok(outcome) => outcome,
        Err(resp) => return resp,
    };

    if params.refine {
        let overrides = match overrides {
            Some(Json(o)) if !record.is_pdf() => o,
            _ => LlmOverrides::default(),
        };
        outcome = match state
            .parser
            .refine_extracted(&doc, outcome, &overrides)
            .await
        {
            Ok(refined) => refined,
            Err(e) => return parse_error_response(e),
        };
    }

    Json(ParseResponse {
        id: record.id,
        markdown: outcome.markdown,
        page: outcome.applied.page(),
        sheet: outcome.applied.sheet().map(String::from),
        slide: outcome.applied.slide(),
        refined: params.refine,
        content_type: record.content_type,
        extension: record.extension,
    })
    .into_response()
}
