//! 임베딩 모듈 - 로컬 다국어 문장 임베딩
//!
//! fastembed(ONNX Runtime)로 `paraphrase-multilingual-MiniLM-L12-v2`를 로컬에서 실행합니다.
//! 영어 질문으로 중국어 문서를 찾는 식의 교차 언어 검색이 가능합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = FastEmbedProvider::load(&cache_dir).await?;
//! let embedding = embedder.embed("What is the return policy?").await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use sha2::{Digest, Sha256};

use crate::error::{RagError, Result};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 고정 길이 벡터로 변환하는 인터페이스입니다.
/// 같은 모델, 같은 입력이면 항상 같은 벡터를 반환해야 합니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 배치 임베딩 (입력 하나당 벡터 하나)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("model returned no embeddings".to_string()))
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 모델 이름
    fn name(&self) -> &str;
}

/// 모델 지문 (SHA-256 앞 8자리)
///
/// 인덱스를 만든 모델과 질문을 임베딩하는 모델이 같은지 확인하는 데 씁니다.
pub fn model_fingerprint(name: &str, dimension: usize) -> String {
    let digest = Sha256::digest(format!("{}:{}", name, dimension).as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

// ============================================================================
// FastEmbed (local ONNX)
// ============================================================================

/// 기본 임베딩 모델
pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// 기본 임베딩 차원
pub const DEFAULT_DIMENSION: usize = 384;

/// 추론 배치 크기
const BATCH_SIZE: usize = 32;

/// fastembed 기반 로컬 임베딩
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedProvider {
    /// 모델 로드 (첫 실행 시 cache_dir로 다운로드)
    ///
    /// 실패하면 `ModelLoad` 에러를 반환하며, 재시도하지 않습니다.
    pub async fn load(cache_dir: &Path) -> Result<Self> {
        let cache_dir: PathBuf = cache_dir.to_path_buf();

        let model = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&cache_dir).map_err(|e| {
                RagError::ModelLoad(format!("Failed to create model cache {:?}: {}", cache_dir, e))
            })?;

            let opts = InitOptions::new(EmbeddingModel::ParaphraseMLMiniLML12V2)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(true);

            TextEmbedding::try_new(opts).map_err(|e| RagError::ModelLoad(e.to_string()))
        })
        .await
        .map_err(|e| RagError::ModelLoad(format!("model loading task failed: {}", e)))??;

        tracing::info!(
            "Loaded embedding model {} (dimension: {})",
            DEFAULT_MODEL_NAME,
            DEFAULT_DIMENSION
        );

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // 추론은 CPU 바운드이므로 spawn_blocking 사용
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| RagError::Embedding(format!("Lock error: {}", e)))?;
            model
                .embed(&texts, Some(BATCH_SIZE))
                .map_err(|e| RagError::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| RagError::Embedding(format!("embedding task failed: {}", e)))?
    }

    fn dimension(&self) -> usize {
        DEFAULT_DIMENSION
    }

    fn name(&self) -> &str {
        DEFAULT_MODEL_NAME
    }
}

// ============================================================================
// Tests
// ============================================================================
