//! Vector Store - 벡터 저장소 트레이트 및 유틸리티
//!
//! 저장소는 컬렉션 전체를 한 번에 교체(`rebuild`)하고,
//! 코사인 유사도 기준 최근접 검색(`query`)을 제공합니다.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Serialize;

use super::chunker::Chunk;
use crate::error::{RagError, Result};

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub chunk: Chunk,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// 코사인 유사도 (1.0 = 동일 방향)
    pub score: f32,
    /// 삽입 순서 (동점 처리용)
    #[serde(skip)]
    pub seq: u64,
}

/// 활성 컬렉션 정보
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    /// 테이블(세대) 이름
    pub name: String,
    pub chunk_count: usize,
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 컬렉션 전체 교체
    ///
    /// 새 컬렉션이 완전히 기록된 뒤에만 교체됩니다.
    /// 실패하면 이전 컬렉션이 그대로 유지됩니다.
    async fn rebuild(&self, entries: Vec<VectorEntry>) -> Result<CollectionInfo>;

    /// 최근접 k개 검색 (유사도 내림차순, 동점은 삽입 순)
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// 활성 컬렉션의 청크 개수 (없으면 0)
    async fn count(&self) -> Result<usize>;

    /// 활성 컬렉션 정보 (한 번도 빌드되지 않았으면 None)
    fn active(&self) -> Option<CollectionInfo>;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// k 값 검증
pub fn validate_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(RagError::Configuration(
            "k must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// 유사도 내림차순, 동점은 삽입 순으로 정렬
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.seq.cmp(&b.seq))
    });
}

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 영벡터면 0.0입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::FileType;

    fn hit(seq: u64, score: f32) -> SearchHit {
        SearchHit {
            chunk: Chunk {
                id: format!("f.txt|p0|c{}", seq),
                source: "f.txt".to_string(),
                file_name: "f.txt".to_string(),
                file_type: FileType::Text,
                page: None,
                chunk_index: seq as u32,
                text: String::new(),
            },
            score,
            seq,
        }
    }

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_mismatch() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_sort_hits_ties_by_insertion() {
        let mut hits = vec![hit(3, 0.5), hit(1, 0.9), hit(2, 0.5), hit(0, 0.5)];
        sort_hits(&mut hits);
        let order: Vec<u64> = hits.iter().map(|h| h.seq).collect();
        assert_eq!(order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_validate_k() {
        assert!(validate_k(1).is_ok());
        assert!(matches!(validate_k(0), Err(RagError::Configuration(_))));
    }
}
