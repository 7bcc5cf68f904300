//! HTTP 핸들러

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::answer::ComposedAnswer;
use crate::app::{AppContext, BuildOptions, BuildReport, StatusReport};
use crate::collector::DocsListing;
use crate::error::RagError;
use crate::i18n::Lang;

const INDEX_HTML: &str = include_str!("ui/index.html");

// ============================================================================
// Request / Response
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DocsQuery {
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub top_k: Option<usize>,
    pub lang: Option<Lang>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    #[serde(flatten)]
    pub answer: ComposedAnswer,
    /// 인용 표시 문자열 (번호 순)
    pub sources: Vec<String>,
}

impl From<ComposedAnswer> for AskResponse {
    fn from(answer: ComposedAnswer) -> Self {
        let sources = answer.citations.iter().map(|c| c.display()).collect();
        Self { answer, sources }
    }
}

// ============================================================================
// Error Response
// ============================================================================

/// API 에러 (UI 언어로 메시지 표시)
#[derive(Debug)]
pub struct ApiError {
    pub error: RagError,
    pub lang: Lang,
}

impl ApiError {
    pub fn new(error: RagError, lang: Lang) -> Self {
        Self { error, lang }
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.error {
            RagError::IndexEmpty => StatusCode::CONFLICT,
            RagError::FolderNotFound(_) => StatusCode::NOT_FOUND,
            RagError::Configuration(_) => StatusCode::BAD_REQUEST,
            RagError::Load { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RagError::ModelLoad(_) | RagError::Embedding(_) | RagError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.error);
        } else {
            tracing::warn!("Request rejected: {}", self.error);
        }

        let body = json!({
            "error": self.lang.error_message(&self.error),
            "kind": self.error.kind(),
        });
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub(super) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub(super) async fn status(State(ctx): State<Arc<AppContext>>) -> Json<StatusReport> {
    Json(ctx.status().await)
}

pub(super) async fn docs(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<DocsQuery>,
) -> Json<DocsListing> {
    Json(ctx.list_docs(query.dir.as_deref()))
}

pub(super) async fn build(
    State(ctx): State<Arc<AppContext>>,
    Json(options): Json<BuildOptions>,
) -> Result<Json<BuildReport>, ApiError> {
    let lang = options.lang.unwrap_or_default();
    ctx.build(options)
        .await
        .map(Json)
        .map_err(|e| ApiError::new(e, lang))
}

pub(super) async fn ask(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let lang = Lang::resolve(req.lang, &req.question);
    ctx.ask(&req.question, req.top_k, req.lang)
        .await
        .map(|answer| Json(answer.into()))
        .map_err(|e| ApiError::new(e, lang))
}

// ============================================================================
// Tests
// ============================================================================
