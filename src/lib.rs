//! rag-desk - 로컬 문서 검색 + 인용 답변
//!
//! 폴더의 txt/pdf/docx 문서를 청크로 나누고, 로컬 다국어 임베딩으로
//! LanceDB에 색인한 뒤, 질문과 가장 가까운 청크를 인용과 함께 보여줍니다.

pub mod answer;
pub mod app;
pub mod cli;
pub mod collector;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod i18n;
pub mod knowledge;
pub mod server;

// Re-exports
pub use answer::{compose, Citation, ComposedAnswer};
pub use app::{AppConfig, AppContext, BuildOptions, BuildReport, IndexState, StatusReport};
pub use collector::{FileCollector, FileType};
pub use embedding::{EmbeddingProvider, FastEmbedProvider};
pub use error::{RagError, Result};
pub use extractor::{ContentExtractor, Document};
pub use i18n::Lang;
pub use knowledge::{
    Chunk, ChunkConfig, LanceVectorStore, SearchHit, TextChunker, VectorEntry, VectorStore,
};
