//! 에러 타입
//!
//! 빌드/질문 파이프라인에서 발생하는 에러 분류입니다.
//! 파일 단위 `Load` 에러는 빌드 중 복구되고, 나머지는 호출자에게 전달됩니다.

use std::path::PathBuf;

use thiserror::Error;

/// rag-desk 결과 타입
pub type Result<T> = std::result::Result<T, RagError>;

/// rag-desk 에러
#[derive(Error, Debug)]
pub enum RagError {
    /// 읽을 수 없거나 지원하지 않는 파일 (건너뛰고 계속 진행)
    #[error("failed to load {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// 문서 폴더가 없음
    #[error("docs folder not found: {0:?}")]
    FolderNotFound(PathBuf),

    /// 잘못된 청크/오버랩 크기 또는 top-k
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// 임베딩 모델 로드 실패 (시작 시 치명적)
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    /// 임베딩 추론 실패
    #[error("embedding error: {0}")]
    Embedding(String),

    /// 벡터 저장소 읽기/쓰기 실패
    #[error("vector store error: {0}")]
    Store(String),

    /// 인덱스가 아직 빌드되지 않음
    #[error("index is empty; build the index first")]
    IndexEmpty,
}

impl RagError {
    /// 에러 종류 이름 (API 응답용)
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::Load { .. } => "load",
            RagError::FolderNotFound(_) => "folder_not_found",
            RagError::Configuration(_) => "configuration",
            RagError::ModelLoad(_) => "model_load",
            RagError::Embedding(_) => "embedding",
            RagError::Store(_) => "store",
            RagError::IndexEmpty => "index_empty",
        }
    }

    pub(crate) fn store(e: impl std::fmt::Display) -> Self {
        RagError::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(RagError::IndexEmpty.kind(), "index_empty");
        assert_eq!(RagError::Configuration("x".into()).kind(), "configuration");
        assert_eq!(RagError::store("disk full").kind(), "store");
    }

    #[test]
    fn test_error_display() {
        let err = RagError::Load {
            path: PathBuf::from("a.bin"),
            reason: "unsupported".to_string(),
        };
        assert!(err.to_string().contains("unsupported"));
    }
}
