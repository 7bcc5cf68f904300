//! LanceDB Vector Store - 세대(generation) 단위 컬렉션 교체
//!
//! 빌드마다 새 테이블 `chunks_{세대}_{모델 지문}`에 전부 기록한 뒤
//! 메모리상의 활성 컬렉션 포인터만 교체합니다. 검색은 교체 전후 어느 한쪽의
//! 완성된 테이블만 보게 됩니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, Int64Array, RecordBatch,
    RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::table::Table;
use lancedb::DistanceType;

use super::chunker::Chunk;
use super::vector::{sort_hits, validate_k, CollectionInfo, SearchHit, VectorEntry, VectorStore};
use crate::collector::FileType;
use crate::error::{RagError, Result};

/// 세대 테이블 이름 접두사
const TABLE_PREFIX: &str = "chunks_";

// ============================================================================
// Generation Naming
// ============================================================================

/// 테이블 이름 생성
fn generation_name(generation: u64, fingerprint: &str) -> String {
    format!("{}{:013}_{}", TABLE_PREFIX, generation, fingerprint)
}

/// 테이블 이름 → (세대, 모델 지문)
fn parse_generation(name: &str) -> Option<(u64, &str)> {
    let (generation, fingerprint) = name.strip_prefix(TABLE_PREFIX)?.split_once('_')?;
    Some((generation.parse().ok()?, fingerprint))
}

// ============================================================================
// LanceVectorStore
// ============================================================================

/// 현재 검색 대상 컬렉션
struct ActiveCollection {
    name: String,
    table: Table,
    chunk_count: usize,
}

/// LanceDB 벡터 저장소 구현
pub struct LanceVectorStore {
    db: Connection,
    path: PathBuf,
    fingerprint: String,
    dimension: usize,
    last_generation: AtomicU64,
    active: RwLock<Option<Arc<ActiveCollection>>>,
}

impl LanceVectorStore {
    /// LanceDB 저장소 열기
    ///
    /// 모델 지문이 일치하는 가장 최근 세대를 활성화합니다.
    ///
    /// # Arguments
    /// * `path` - LanceDB 디렉토리 경로
    /// * `fingerprint` - 임베딩 모델 지문
    /// * `dimension` - 임베딩 차원
    pub async fn open(path: &Path, fingerprint: &str, dimension: usize) -> Result<Self> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| RagError::Store(format!("Failed to create LanceDB directory: {}", e)))?;

        let path_str = path
            .to_str()
            .ok_or_else(|| RagError::Store("Invalid path encoding".to_string()))?;

        let db = lancedb::connect(path_str)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            db,
            path: path.to_path_buf(),
            fingerprint: fingerprint.to_string(),
            dimension,
            last_generation: AtomicU64::new(0),
            active: RwLock::new(None),
        };

        store.activate_latest().await?;
        store.prune_stale().await;
        Ok(store)
    }

    /// 저장소 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 세대 테이블 목록 (세대 오름차순)
    async fn generations(&self) -> Result<Vec<(u64, String)>> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list tables: {}", e)))?;

        let mut generations: Vec<(u64, String)> = names
            .into_iter()
            .filter_map(|name| parse_generation(&name).map(|(g, _)| (g, name.clone())))
            .collect();
        generations.sort();
        Ok(generations)
    }

    /// 시작 시 최신 세대 활성화
    async fn activate_latest(&self) -> Result<()> {
        let generations = self.generations().await?;

        if let Some((newest, _)) = generations.last() {
            self.last_generation.store(*newest, Ordering::SeqCst);
        }

        let newest_matching = generations.iter().rev().find(|(_, name)| {
            parse_generation(name).is_some_and(|(_, fp)| fp == self.fingerprint)
        });

        match (generations.last(), newest_matching) {
            (Some((_, newest)), Some((_, matching))) if newest != matching => {
                tracing::warn!(
                    "Newest index {} was built with a different embedding model; using {}",
                    newest,
                    matching
                );
            }
            (Some((_, newest)), None) => {
                tracing::warn!(
                    "Index {} was built with a different embedding model. Rebuild the index.",
                    newest
                );
                return Ok(());
            }
            (None, _) => {
                tracing::info!("No index found at {:?}", self.path);
                return Ok(());
            }
            _ => {}
        }

        let Some((_, name)) = newest_matching else {
            return Ok(());
        };

        let table = self
            .db
            .open_table(name)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open table {}: {}", name, e)))?;
        let chunk_count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count rows: {}", e)))?;

        tracing::info!("Activated index {} ({} chunks)", name, chunk_count);
        self.swap(ActiveCollection {
            name: name.clone(),
            table,
            chunk_count,
        });
        Ok(())
    }

    /// 활성 세대를 제외한 테이블 삭제 (실패는 경고만)
    ///
    /// 활성 세대가 없으면 아무것도 지우지 않습니다.
    async fn prune_stale(&self) {
        let Some(active_name) = self.snapshot().map(|a| a.name.clone()) else {
            return;
        };

        let generations = match self.generations().await {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!("Failed to list stale indexes: {}", e);
                return;
            }
        };

        for (_, name) in generations {
            if name == active_name {
                continue;
            }
            match self.db.drop_table(&name).await {
                Ok(()) => tracing::debug!("Dropped stale index {}", name),
                Err(e) => tracing::warn!("Failed to drop stale index {}: {}", name, e),
            }
        }
    }

    /// 활성 컬렉션 스냅샷
    fn snapshot(&self) -> Option<Arc<ActiveCollection>> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 활성 컬렉션 교체
    fn swap(&self, next: ActiveCollection) {
        let mut guard = self.active.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Arc::new(next));
    }

    /// 다음 세대 번호 (단조 증가)
    fn next_generation(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let previous = self
            .last_generation
            .fetch_max(now, Ordering::SeqCst);
        if previous >= now {
            self.last_generation.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            now
        }
    }

    /// 벡터 테이블 스키마 생성
    fn create_schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("seq", DataType::Int64, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("file_name", DataType::Utf8, false),
            Field::new("file_type", DataType::Utf8, false),
            Field::new("page", DataType::Int32, true),
            Field::new("chunk_index", DataType::Int32, false),
            Field::new("chunk_text", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension as i32,
                ),
                false,
            ),
        ])
    }

    /// 엔트리들을 Arrow RecordBatch로 변환
    fn entries_to_batch(&self, schema: SchemaRef, entries: &[VectorEntry]) -> Result<RecordBatch> {
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != self.dimension) {
            return Err(RagError::Store(format!(
                "embedding for {} has dimension {}, expected {}",
                bad.chunk.id,
                bad.embedding.len(),
                self.dimension
            )));
        }

        let seqs: Vec<i64> = (0..entries.len() as i64).collect();
        let sources: Vec<&str> = entries.iter().map(|e| e.chunk.source.as_str()).collect();
        let file_names: Vec<&str> = entries.iter().map(|e| e.chunk.file_name.as_str()).collect();
        let file_types: Vec<&str> = entries.iter().map(|e| e.chunk.file_type.as_str()).collect();
        let pages: Vec<Option<i32>> = entries
            .iter()
            .map(|e| e.chunk.page.map(|p| p as i32))
            .collect();
        let chunk_indices: Vec<i32> = entries.iter().map(|e| e.chunk.chunk_index as i32).collect();
        let chunk_texts: Vec<&str> = entries.iter().map(|e| e.chunk.text.as_str()).collect();

        // 임베딩을 FixedSizeList로 변환
        let embeddings_flat: Vec<f32> = entries
            .iter()
            .flat_map(|e| e.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings_list = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )
        .map_err(|e| RagError::Store(format!("Failed to create embedding array: {}", e)))?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(seqs)),
                Arc::new(StringArray::from(sources)),
                Arc::new(StringArray::from(file_names)),
                Arc::new(StringArray::from(file_types)),
                Arc::new(Int32Array::from(pages)),
                Arc::new(Int32Array::from(chunk_indices)),
                Arc::new(StringArray::from(chunk_texts)),
                Arc::new(embeddings_list),
            ],
        )
        .map_err(|e| RagError::Store(format!("Failed to create RecordBatch: {}", e)))
    }

    /// 새 세대 테이블 기록
    async fn write_generation(&self, name: &str, entries: &[VectorEntry]) -> Result<Table> {
        let schema = Arc::new(self.create_schema());

        if entries.is_empty() {
            return self
                .db
                .create_empty_table(name, schema)
                .execute()
                .await
                .map_err(|e| RagError::Store(format!("Failed to create table: {}", e)));
        }

        let batch = self.entries_to_batch(schema.clone(), entries)?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
        self.db
            .create_table(name, batches)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to create table: {}", e)))
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn rebuild(&self, entries: Vec<VectorEntry>) -> Result<CollectionInfo> {
        // 이전 빌드에서 밀려난 세대 정리 (현재 활성 세대는 유지)
        self.prune_stale().await;

        let name = generation_name(self.next_generation(), &self.fingerprint);

        let table = match self.write_generation(&name, &entries).await {
            Ok(table) => table,
            Err(e) => {
                if let Err(drop_err) = self.db.drop_table(&name).await {
                    tracing::debug!("No partial table {} to drop: {}", name, drop_err);
                }
                return Err(e);
            }
        };

        let info = CollectionInfo {
            name: name.clone(),
            chunk_count: entries.len(),
        };
        self.swap(ActiveCollection {
            name,
            table,
            chunk_count: entries.len(),
        });

        tracing::info!("Index {} is now active ({} chunks)", info.name, info.chunk_count);
        Ok(info)
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        validate_k(k)?;

        let Some(active) = self.snapshot() else {
            return Ok(vec![]);
        };
        if active.chunk_count == 0 {
            return Ok(vec![]);
        }
        if embedding.len() != self.dimension {
            return Err(RagError::Store(format!(
                "query embedding has dimension {}, expected {}",
                embedding.len(),
                self.dimension
            )));
        }

        let results = active
            .table
            .vector_search(embedding.to_vec())
            .map_err(|e| RagError::Store(format!("Failed to create vector search: {}", e)))?
            .column("embedding")
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to execute vector search: {}", e)))?;

        let batches: Vec<RecordBatch> = results.try_collect().await.map_err(RagError::store)?;

        let mut hits = Vec::new();
        for batch in &batches {
            hits.extend(batch_to_hits(batch)?);
        }

        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        let Some(active) = self.snapshot() else {
            return Ok(0);
        };

        active
            .table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count rows: {}", e)))
    }

    fn active(&self) -> Option<CollectionInfo> {
        self.snapshot().map(|a| CollectionInfo {
            name: a.name.clone(),
            chunk_count: a.chunk_count,
        })
    }
}

/// 검색 결과 RecordBatch → SearchHit
fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
    fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<T>())
            .ok_or_else(|| RagError::Store(format!("Missing {} column", name)))
    }

    let seqs = column::<Int64Array>(batch, "seq")?;
    let sources = column::<StringArray>(batch, "source")?;
    let file_names = column::<StringArray>(batch, "file_name")?;
    let file_types = column::<StringArray>(batch, "file_type")?;
    let pages = column::<Int32Array>(batch, "page")?;
    let chunk_indices = column::<Int32Array>(batch, "chunk_index")?;
    let chunk_texts = column::<StringArray>(batch, "chunk_text")?;
    // _distance 컬럼 (LanceDB가 자동 추가)
    let distances = column::<Float32Array>(batch, "_distance")?;

    (0..batch.num_rows())
        .map(|i| {
            let file_type = FileType::from_extension(file_types.value(i)).ok_or_else(|| {
                RagError::Store(format!("Unknown file type {:?}", file_types.value(i)))
            })?;
            let page = (!pages.is_null(i)).then(|| pages.value(i) as u32);
            let chunk_index = chunk_indices.value(i) as u32;
            let file_name = file_names.value(i).to_string();

            Ok(SearchHit {
                chunk: Chunk {
                    id: Chunk::make_id(&file_name, page, chunk_index),
                    source: sources.value(i).to_string(),
                    file_name,
                    file_type,
                    page,
                    chunk_index,
                    text: chunk_texts.value(i).to_string(),
                },
                // 코사인 거리 → 유사도
                score: 1.0 - distances.value(i),
                seq: seqs.value(i) as u64,
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
