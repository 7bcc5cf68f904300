//! 애플리케이션 설정
//!
//! CLI 인자(`cli::Cli`)에서 만들어지며, 상대 경로는 기준 디렉토리에 대해 해석합니다.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::knowledge::ChunkConfig;

/// 기본 포트
pub const DEFAULT_PORT: u16 = 8501;
/// 기본 문서 폴더
pub const DEFAULT_DOCS_DIR: &str = "docs";
/// 기본 top-k
pub const DEFAULT_TOP_K: usize = 5;
/// UI에서 허용하는 최대 top-k
pub const MAX_TOP_K: usize = 10;

/// 데이터 디렉토리 경로 (~/.local/share/rag-desk 등)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rag-desk")
}

/// 애플리케이션 설정
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// 상대 경로 해석 기준 (보통 현재 작업 디렉토리)
    pub base_dir: PathBuf,
    /// 기본 문서 폴더 (사용자 입력 그대로)
    pub docs_dir: String,
    /// LanceDB, 모델 캐시 위치
    pub data_dir: PathBuf,
    pub chunk: ChunkConfig,
    pub top_k: usize,
    pub port: u16,
    pub open_browser: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            docs_dir: DEFAULT_DOCS_DIR.to_string(),
            data_dir: get_data_dir(),
            chunk: ChunkConfig::default(),
            top_k: DEFAULT_TOP_K,
            port: DEFAULT_PORT,
            open_browser: true,
        }
    }
}

impl AppConfig {
    /// 기본 설정에서 기준/데이터 디렉토리만 지정 (테스트, 임베딩용)
    pub fn with_dirs(base_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            data_dir: data_dir.into(),
            open_browser: false,
            ..Default::default()
        }
    }

    /// LanceDB 디렉토리
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("lance_db")
    }

    /// 임베딩 모델 캐시 디렉토리
    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    /// 기본 문서 폴더 (해석된 경로)
    pub fn default_docs_dir(&self) -> PathBuf {
        self.resolve_path(&self.docs_dir)
    }

    /// 사용자 입력 경로 해석
    ///
    /// 앞뒤 공백과 따옴표를 제거하고, 상대 경로는 기준 디렉토리에 붙입니다.
    pub fn resolve_path(&self, input: &str) -> PathBuf {
        let cleaned = input.trim().trim_matches(|c| c == '"' || c == '\'');
        let path = Path::new(cleaned);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_path() {
        let config = AppConfig::with_dirs("/srv/app", "/srv/data");
        assert_eq!(config.resolve_path("docs"), PathBuf::from("/srv/app/docs"));
        assert_eq!(config.resolve_path(" \"docs\" "), PathBuf::from("/srv/app/docs"));
        assert_eq!(config.resolve_path("'sub/dir'"), PathBuf::from("/srv/app/sub/dir"));
    }

    #[test]
    fn test_resolve_absolute_path() {
        let config = AppConfig::with_dirs("/srv/app", "/srv/data");
        assert_eq!(config.resolve_path("/tmp/docs"), PathBuf::from("/tmp/docs"));
    }

    #[test]
    fn test_derived_dirs() {
        let config = AppConfig::with_dirs("/srv/app", "/srv/data");
        assert_eq!(config.store_dir(), PathBuf::from("/srv/data/lance_db"));
        assert_eq!(config.model_dir(), PathBuf::from("/srv/data/models"));
        assert_eq!(config.default_docs_dir(), PathBuf::from("/srv/app/docs"));
        assert!(!config.open_browser);
    }
}
