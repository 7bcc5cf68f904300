//! CLI 모듈
//!
//! rag-desk 실행 인자 정의 및 서버 기동

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use crate::app::{get_data_dir, AppConfig, AppContext, DEFAULT_DOCS_DIR};
use crate::knowledge::{ChunkConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::server;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "rag-desk")]
#[command(version, about = "로컬 문서 검색 + 인용 답변 데모", long_about = None)]
pub struct Cli {
    /// UI 포트
    #[arg(short, long, env = "RAGDESK_PORT", default_value_t = crate::app::DEFAULT_PORT)]
    pub port: u16,

    /// 문서 폴더 (상대 경로는 현재 디렉토리 기준)
    #[arg(short, long, env = "RAGDESK_DOCS_DIR", default_value = DEFAULT_DOCS_DIR)]
    pub docs_dir: String,

    /// 데이터 디렉토리 (벡터 저장소, 모델 캐시)
    #[arg(long, env = "RAGDESK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// 청크 크기 (문자 수)
    #[arg(long, env = "RAGDESK_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// 청크 오버랩 (문자 수)
    #[arg(long, env = "RAGDESK_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,

    /// 기본 검색 결과 개수
    #[arg(short = 'k', long, env = "RAGDESK_TOP_K", default_value_t = crate::app::DEFAULT_TOP_K)]
    pub top_k: usize,

    /// 브라우저 자동 실행 안 함
    #[arg(long, env = "RAGDESK_NO_BROWSER")]
    pub no_browser: bool,
}

impl Cli {
    /// 실행 인자 → 애플리케이션 설정
    pub fn into_config(self) -> Result<AppConfig> {
        let base_dir = std::env::current_dir().context("현재 디렉토리 확인 실패")?;

        Ok(AppConfig {
            base_dir,
            docs_dir: self.docs_dir,
            data_dir: self.data_dir.unwrap_or_else(get_data_dir),
            chunk: ChunkConfig::new(self.chunk_size, self.chunk_overlap),
            top_k: self.top_k,
            port: self.port,
            open_browser: !self.no_browser,
        })
    }
}

// ============================================================================
// CLI Runner
// ============================================================================

/// 모델 로드 → 저장소 열기 → UI 서버 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;

    println!("rag-desk v{}", env!("CARGO_PKG_VERSION"));
    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());
    println!("[*] 문서 폴더: {}", config.default_docs_dir().display());
    println!("[*] 임베딩 모델 로드 중 (첫 실행 시 다운로드)...");

    let ctx = AppContext::init(config)
        .await
        .context("애플리케이션 초기화 실패")?;
    let ctx = Arc::new(ctx);

    let status = ctx.status().await;
    match status.collection {
        Some(ref name) => println!("[OK] 인덱스: {} ({} 청크)", name, status.chunk_count),
        None => println!("[!] 인덱스 없음: UI에서 Build / Rebuild Index를 실행하세요"),
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], ctx.config().port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("포트 바인딩 실패: {}", addr))?;

    let url = format!("http://{}", addr);
    println!("[OK] UI: {}", url);
    tracing::info!("Listening on {}", url);

    if ctx.config().open_browser {
        open_browser(&url);
    }

    server::serve(listener, Arc::clone(&ctx))
        .await
        .context("서버 실행 실패")?;
    ctx.shutdown().await;

    println!("[OK] 종료");
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 기본 브라우저로 URL 열기 (실패해도 계속 진행)
fn open_browser(url: &str) {
    if let Err(e) = spawn_reaped(browser_command(url)) {
        tracing::warn!("Could not open browser ({}); open {} manually", e, url);
    }
}

/// 플랫폼별 브라우저 실행 명령
fn browser_command(url: &str) -> tokio::process::Command {
    let (program, args): (&str, &[&str]) = if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else if cfg!(target_os = "macos") {
        ("open", &[])
    } else {
        ("xdg-open", &[])
    };

    let mut command = tokio::process::Command::new(program);
    command.args(args).arg(url);
    command
}

/// 자식 프로세스 실행 후 백그라운드에서 종료 상태 회수
fn spawn_reaped(
    mut command: tokio::process::Command,
) -> std::io::Result<tokio::task::JoinHandle<std::io::Result<std::process::ExitStatus>>> {
    let mut child = command.spawn()?;
    Ok(tokio::spawn(async move { child.wait().await }))
}

// ============================================================================
// Tests
// ============================================================================
