//! 로컬 웹 UI 서버
//!
//! axum 라우터로 단일 페이지 UI와 JSON API를 제공합니다.
//! 127.0.0.1에만 바인딩합니다.

mod routes;

pub use routes::{ApiError, AskRequest, AskResponse, DocsQuery};

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::app::AppContext;

/// 라우터 생성
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/api/status", get(routes::status))
        .route("/api/docs", get(routes::docs))
        .route("/api/build", post(routes::build))
        .route("/api/ask", post(routes::ask))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// 서버 실행 (Ctrl+C로 종료)
pub async fn serve(listener: TcpListener, ctx: Arc<AppContext>) -> std::io::Result<()> {
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
