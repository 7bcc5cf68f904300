//! Knowledge 모듈 - 청킹 + 벡터 저장소
//!
//! - Chunker: 고정 길이(문자 수) 텍스트 분할
//! - VectorStore: 컬렉션 교체/최근접 검색 트레이트
//! - LanceDB: 세대 단위 테이블 교체로 구현한 벡터 저장소

mod chunker;
mod lance;
mod vector;

// Re-exports
pub use chunker::{
    Chunk, ChunkConfig, ChunkSpan, ChunkSpans, TextChunker, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE,
};
pub use lance::LanceVectorStore;
pub use vector::{
    cosine_similarity, sort_hits, validate_k, CollectionInfo, SearchHit, VectorEntry, VectorStore,
};
