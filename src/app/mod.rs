//! 애플리케이션 컨텍스트
//!
//! 임베딩 모델, 벡터 저장소, 설정을 한곳에 묶고 빌드/질문 흐름을 조율합니다.
//!
//! - 빌드: 수집 → 추출 → 청킹 → 임베딩 → 컬렉션 교체 (한 번에 하나만 실행)
//! - 질문: 빌드 잠금 없이 현재 활성 컬렉션 스냅샷을 검색

mod config;

pub use config::{
    get_data_dir, AppConfig, DEFAULT_DOCS_DIR, DEFAULT_PORT, DEFAULT_TOP_K, MAX_TOP_K,
};

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::answer::{self, ComposedAnswer};
use crate::collector::{self, DocsListing, FileCollector, SkippedFile};
use crate::embedding::{model_fingerprint, EmbeddingProvider, FastEmbedProvider};
use crate::error::{RagError, Result};
use crate::extractor::ContentExtractor;
use crate::i18n::Lang;
use crate::knowledge::{
    validate_k, Chunk, ChunkConfig, LanceVectorStore, TextChunker, VectorEntry, VectorStore,
};

/// 한 번에 임베딩할 청크 수
const EMBED_BATCH: usize = 64;

// ============================================================================
// Types
// ============================================================================

/// 인덱스 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexState {
    /// 활성 컬렉션 없음 (검색 불가)
    IndexEmpty,
    /// 활성 컬렉션 있음 (비어 있을 수 있음)
    IndexReady,
}

/// 빌드 요청 (지정하지 않은 값은 설정 기본값)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildOptions {
    pub docs_dir: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub lang: Option<Lang>,
}

/// 빌드 결과
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub docs_dir: String,
    pub collection: String,
    pub files: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedFile>,
    pub chunk: ChunkConfig,
    pub built_at: String,
    pub elapsed_ms: u128,
    /// 표시용 완료 메시지
    pub message: String,
}

/// 상태 조회 결과
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: IndexState,
    pub collection: Option<String>,
    pub chunk_count: usize,
    pub model: String,
    pub dimension: usize,
    pub store_path: String,
    pub docs_dir: String,
    pub chunk: ChunkConfig,
    pub top_k: usize,
    pub max_top_k: usize,
    pub last_build: Option<BuildReport>,
}

// ============================================================================
// AppContext
// ============================================================================

/// 애플리케이션 컨텍스트
pub struct AppContext {
    config: AppConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: LanceVectorStore,
    /// 빌드 직렬화
    build_lock: Mutex<()>,
    last_build: RwLock<Option<BuildReport>>,
}

impl AppContext {
    /// 로컬 임베딩 모델을 로드하고 저장소를 엽니다.
    ///
    /// 모델 로드 실패는 `ModelLoad` 에러로 그대로 반환됩니다.
    pub async fn init(config: AppConfig) -> Result<Self> {
        let embedder = FastEmbedProvider::load(&config.model_dir()).await?;
        Self::with_embedder(config, Arc::new(embedder)).await
    }

    /// 주어진 임베딩 프로바이더로 컨텍스트 생성
    pub async fn with_embedder(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.chunk.validate()?;
        validate_top_k(config.top_k)?;

        let fingerprint = model_fingerprint(embedder.name(), embedder.dimension());
        let store =
            LanceVectorStore::open(&config.store_dir(), &fingerprint, embedder.dimension()).await?;

        match store.active() {
            Some(info) => tracing::info!(
                "Using index {} ({} chunks)",
                info.name,
                info.chunk_count
            ),
            None => tracing::warn!(
                "No index for model {} at {:?}; build the index before asking",
                embedder.name(),
                store.path()
            ),
        }

        Ok(Self {
            config,
            embedder,
            store,
            build_lock: Mutex::new(()),
            last_build: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 현재 인덱스 상태
    pub fn state(&self) -> IndexState {
        if self.store.active().is_some() {
            IndexState::IndexReady
        } else {
            IndexState::IndexEmpty
        }
    }

    /// 문서 폴더 목록 (없으면 기본 폴더)
    pub fn list_docs(&self, dir: Option<&str>) -> DocsListing {
        let path = match dir {
            Some(d) if !d.trim().is_empty() => self.config.resolve_path(d),
            _ => self.config.default_docs_dir(),
        };
        collector::list_docs(&path)
    }

    /// 상태 조회
    pub async fn status(&self) -> StatusReport {
        let active = self.store.active();
        StatusReport {
            state: self.state(),
            collection: active.as_ref().map(|a| a.name.clone()),
            chunk_count: active.map_or(0, |a| a.chunk_count),
            model: self.embedder.name().to_string(),
            dimension: self.embedder.dimension(),
            store_path: self.store.path().display().to_string(),
            docs_dir: self.config.default_docs_dir().display().to_string(),
            chunk: self.config.chunk,
            top_k: self.config.top_k,
            max_top_k: MAX_TOP_K,
            last_build: self.last_build.read().await.clone(),
        }
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// 인덱스 빌드 (전체 재구축)
    ///
    /// 설정 검증은 어떤 쓰기보다 먼저 수행됩니다.
    /// 실패하면 이전 컬렉션이 그대로 활성 상태로 남습니다.
    pub async fn build(&self, options: BuildOptions) -> Result<BuildReport> {
        let chunk_config = ChunkConfig::new(
            options.chunk_size.unwrap_or(self.config.chunk.chunk_size),
            options.chunk_overlap.unwrap_or(self.config.chunk.chunk_overlap),
        );
        let chunker = TextChunker::new(chunk_config)?;

        let docs_dir = match options.docs_dir.as_deref() {
            Some(d) if !d.trim().is_empty() => self.config.resolve_path(d),
            _ => self.config.default_docs_dir(),
        };
        let lang = options.lang.unwrap_or_default();

        let _guard = self.build_lock.lock().await;
        let started = Instant::now();
        tracing::info!(
            "Building index from {:?} (chunk size {}, overlap {})",
            docs_dir,
            chunk_config.chunk_size,
            chunk_config.chunk_overlap
        );

        let collection = FileCollector::new().collect_directory(&docs_dir)?;
        let loaded = ContentExtractor::new().load_all(collection).await;
        let skipped = loaded.skipped;

        let chunks: Vec<Chunk> = loaded
            .documents
            .iter()
            .flat_map(|doc| chunker.chunk_document(doc))
            .collect();
        tracing::info!(
            "Loaded {} documents into {} chunks ({} skipped)",
            loaded.documents.len(),
            chunks.len(),
            skipped.len()
        );

        let entries = self.embed_chunks(chunks).await?;
        let info = self.store.rebuild(entries).await?;

        let report = BuildReport {
            docs_dir: docs_dir.display().to_string(),
            collection: info.name,
            files: loaded.documents.len(),
            chunks: info.chunk_count,
            skipped,
            chunk: chunk_config,
            built_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            elapsed_ms: started.elapsed().as_millis(),
            message: lang.build_done(loaded.documents.len(), info.chunk_count),
        };

        tracing::info!(
            "Index built: {} files, {} chunks in {} ms",
            report.files,
            report.chunks,
            report.elapsed_ms
        );

        *self.last_build.write().await = Some(report.clone());
        Ok(report)
    }

    /// 청크 임베딩 (배치 단위)
    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<VectorEntry>> {
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            entries.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(chunk, embedding)| VectorEntry { chunk, embedding }),
            );
        }

        Ok(entries)
    }

    /// 종료 (진행 중인 빌드가 끝날 때까지 대기)
    pub async fn shutdown(&self) {
        let _guard = self.build_lock.lock().await;
        tracing::info!("Application context shut down");
    }

    // ========================================================================
    // Ask
    // ========================================================================

    /// 질문에 답변 (top_k 없으면 기본값)
    pub async fn ask(
        &self,
        question: &str,
        top_k: Option<usize>,
        lang: Option<Lang>,
    ) -> Result<ComposedAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::Configuration("question is empty".to_string()));
        }

        let k = top_k.unwrap_or(self.config.top_k);
        validate_top_k(k)?;

        let Some(active) = self.store.active() else {
            return Err(RagError::IndexEmpty);
        };

        let lang = Lang::resolve(lang, question);
        if active.chunk_count == 0 {
            return Ok(answer::compose(question, &[], lang));
        }

        let embedding = self.embedder.embed(question).await?;
        let hits = self.store.query(&embedding, k).await?;
        tracing::debug!("Question matched {} chunks (k = {})", hits.len(), k);

        Ok(answer::compose(question, &hits, lang))
    }
}

/// top-k 범위 확인 (1..=MAX_TOP_K)
pub fn validate_top_k(k: usize) -> Result<()> {
    validate_k(k)?;
    if k > MAX_TOP_K {
        return Err(RagError::Configuration(format!(
            "top-k must be at most {}, got {}",
            MAX_TOP_K, k
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// 글자 빈도 기반 결정적 임베딩
    struct LetterEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            26
        }

        fn name(&self) -> &str {
            "letters"
        }
    }

    async fn context(root: &TempDir) -> AppContext {
        let config = AppConfig::with_dirs(root.path(), root.path().join("data"));
        AppContext::with_embedder(config, Arc::new(LetterEmbedder))
            .await
            .unwrap()
    }

    #[test]
    fn test_validate_top_k() {
        assert!(validate_top_k(1).is_ok());
        assert!(validate_top_k(MAX_TOP_K).is_ok());
        assert!(validate_top_k(0).is_err());
        assert!(validate_top_k(MAX_TOP_K + 1).is_err());
    }

    #[test]
    fn test_index_state_serialization() {
        assert_eq!(
            serde_json::to_string(&IndexState::IndexEmpty).unwrap(),
            "\"INDEX_EMPTY\""
        );
        assert_eq!(
            serde_json::to_string(&IndexState::IndexReady).unwrap(),
            "\"INDEX_READY\""
        );
    }

    #[tokio::test]
    async fn test_ask_before_build() {
        let root = TempDir::new().unwrap();
        let ctx = context(&root).await;

        assert_eq!(ctx.state(), IndexState::IndexEmpty);
        let err = ctx.ask("anything", None, None).await.unwrap_err();
        assert!(matches!(err, RagError::IndexEmpty));
    }

    #[tokio::test]
    async fn test_build_missing_folder() {
        let root = TempDir::new().unwrap();
        let ctx = context(&root).await;

        let err = ctx.build(BuildOptions::default()).await.unwrap_err();
        assert!(matches!(err, RagError::FolderNotFound(_)));
        assert_eq!(ctx.state(), IndexState::IndexEmpty);
    }

    #[tokio::test]
    async fn test_build_and_ask() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("docs")).unwrap();
        std::fs::write(root.path().join("docs/zebra.txt"), "zebra zebra zoo").unwrap();
        std::fs::write(root.path().join("docs/apple.txt"), "apple banana").unwrap();
        let ctx = context(&root).await;

        let report = ctx.build(BuildOptions::default()).await.unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.chunks, 2);
        assert_eq!(report.message, "Done. Files: 2, chunks: 2");
        assert_eq!(ctx.state(), IndexState::IndexReady);

        let answer = ctx.ask("zebra zoo", Some(1), None).await.unwrap();
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].file, "zebra.txt");
        assert_eq!(answer.lang, Lang::En);

        let status = ctx.status().await;
        assert_eq!(status.chunk_count, 2);
        assert!(status.last_build.is_some());
    }

    #[tokio::test]
    async fn test_invalid_chunk_config_rejected_before_build() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("docs")).unwrap();
        std::fs::write(root.path().join("docs/a.txt"), "alpha").unwrap();
        let ctx = context(&root).await;
        ctx.build(BuildOptions::default()).await.unwrap();
        let before = ctx.status().await.collection;

        let err = ctx
            .build(BuildOptions {
                chunk_size: Some(100),
                chunk_overlap: Some(100),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Configuration(_)));
        assert_eq!(ctx.status().await.collection, before);
    }

    #[tokio::test]
    async fn test_ask_top_k_bounds() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("docs")).unwrap();
        std::fs::write(root.path().join("docs/a.txt"), "alpha").unwrap();
        let ctx = context(&root).await;
        ctx.build(BuildOptions::default()).await.unwrap();

        for k in [0, MAX_TOP_K + 1] {
            let err = ctx.ask("alpha", Some(k), None).await.unwrap_err();
            assert!(matches!(err, RagError::Configuration(_)));
        }
        assert!(ctx.ask("alpha", Some(MAX_TOP_K), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let root = TempDir::new().unwrap();
        let ctx = context(&root).await;
        let err = ctx.ask("   ", None, None).await.unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_list_docs_resolves_relative_folder() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("notes")).unwrap();
        std::fs::write(root.path().join("notes/a.txt"), "alpha").unwrap();
        let ctx = context(&root).await;

        let listing = ctx.list_docs(Some("\"notes\""));
        assert!(listing.exists);
        assert_eq!(listing.docs.len(), 1);

        let missing = ctx.list_docs(None);
        assert!(!missing.exists);
    }
}
