//! 답변 구성 모듈
//!
//! 검색된 청크로 템플릿 기반 답변과 인용 목록을 만듭니다.
//! 요약 모델 없이 청크 스니펫을 검색 순서대로 나열합니다.

use serde::Serialize;

use crate::collector::FileType;
use crate::i18n::Lang;
use crate::knowledge::SearchHit;

/// 스니펫 최대 글자 수
pub const SNIPPET_MAX_CHARS: usize = 260;

// ============================================================================
// Types
// ============================================================================

/// 인용 (검색된 청크의 표시용 투영)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    /// 1부터 시작하는 번호
    pub marker: usize,
    pub file: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub page: Option<u32>,
    pub chunk_index: u32,
    pub score: f32,
}

impl Citation {
    /// `policy.txt | txt | page=None | chunk=0` 형식
    pub fn display(&self) -> String {
        let page = self
            .page
            .map_or_else(|| "None".to_string(), |p| p.to_string());
        format!(
            "{} | {} | page={} | chunk={}",
            self.file, self.file_type, page, self.chunk_index
        )
    }
}

/// 답변 항목
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerBullet {
    pub marker: usize,
    pub snippet: String,
}

/// 구성된 답변
#[derive(Debug, Clone, Serialize)]
pub struct ComposedAnswer {
    pub question: String,
    pub lang: Lang,
    pub heading: &'static str,
    pub sources_heading: &'static str,
    /// 표시용 답변 본문
    pub text: String,
    pub bullets: Vec<AnswerBullet>,
    pub citations: Vec<Citation>,
}

impl ComposedAnswer {
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}

// ============================================================================
// Composer
// ============================================================================

/// 질문과 검색 결과(검색 순서 유지)로 답변 구성
pub fn compose(question: &str, hits: &[SearchHit], lang: Lang) -> ComposedAnswer {
    let bullets: Vec<AnswerBullet> = hits
        .iter()
        .zip(1..)
        .map(|(hit, marker)| AnswerBullet {
            marker,
            snippet: truncate_text(&hit.chunk.text, SNIPPET_MAX_CHARS),
        })
        .collect();

    let citations: Vec<Citation> = hits
        .iter()
        .zip(1..)
        .map(|(hit, marker)| Citation {
            marker,
            file: hit.chunk.file_name.clone(),
            file_type: hit.chunk.file_type,
            page: hit.chunk.page,
            chunk_index: hit.chunk.chunk_index,
            score: hit.score,
        })
        .collect();

    let text = if bullets.is_empty() {
        lang.no_results().to_string()
    } else {
        bullets
            .iter()
            .map(|b| format!("- {} [{}]", b.snippet, b.marker))
            .collect::<Vec<_>>()
            .join("\n")
    };

    ComposedAnswer {
        question: question.to_string(),
        lang,
        heading: lang.answer_heading(),
        sources_heading: lang.sources_heading(),
        text,
        bullets,
        citations,
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전)
///
/// 줄바꿈은 공백으로 바꾸고, 넘치면 `…`를 붙입니다.
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}…", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Chunk;

    fn hit(file: &str, file_type: FileType, page: Option<u32>, index: u32, text: &str) -> SearchHit {
        SearchHit {
            chunk: Chunk {
                id: Chunk::make_id(file, page, index),
                source: file.to_string(),
                file_name: file.to_string(),
                file_type,
                page,
                chunk_index: index,
                text: text.to_string(),
            },
            score: 0.9,
            seq: index as u64,
        }
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello…");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
        assert_eq!(truncate_text("  a\r\nb  ", 20), "a b");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate_text("退货政策在三十天内有效", 4), "退货政策…");
    }

    #[test]
    fn test_citation_display() {
        let answer = compose(
            "What is the return policy?",
            &[hit("policy.txt", FileType::Text, None, 0, "Returns within 30 days.")],
            Lang::En,
        );
        assert_eq!(
            answer.citations[0].display(),
            "policy.txt | txt | page=None | chunk=0"
        );

        let pdf = compose("q", &[hit("manual.pdf", FileType::Pdf, Some(3), 7, "x")], Lang::En);
        assert_eq!(pdf.citations[0].display(), "manual.pdf | pdf | page=3 | chunk=7");
    }

    #[test]
    fn test_citation_serialization_matches_display() {
        let answer = compose(
            "What is the return policy?",
            &[hit("policy.txt", FileType::Text, None, 0, "Returns within 30 days.")],
            Lang::En,
        );
        let json = serde_json::to_value(&answer.citations[0]).unwrap();

        assert_eq!(json["file"], "policy.txt");
        assert_eq!(json["type"], "txt");
        assert!(json["page"].is_null());
        assert_eq!(json["chunk_index"], 0);
        assert_eq!(json["marker"], 1);
    }

    #[test]
    fn test_compose_preserves_order() {
        let hits = vec![
            hit("b.txt", FileType::Text, None, 2, "second file\nfirst hit"),
            hit("a.txt", FileType::Text, None, 0, "first file"),
        ];
        let answer = compose("q", &hits, Lang::En);

        assert_eq!(answer.heading, "Answer");
        assert_eq!(answer.text, "- second file first hit [1]\n- first file [2]");
        let files: Vec<&str> = answer.citations.iter().map(|c| c.file.as_str()).collect();
        assert_eq!(files, vec!["b.txt", "a.txt"]);
        assert_eq!(answer.citations[1].marker, 2);
    }

    #[test]
    fn test_compose_long_snippet() {
        let long = "x".repeat(SNIPPET_MAX_CHARS + 40);
        let answer = compose("q", &[hit("a.txt", FileType::Text, None, 0, &long)], Lang::En);
        assert_eq!(answer.bullets[0].snippet.chars().count(), SNIPPET_MAX_CHARS + 1);
        assert!(answer.bullets[0].snippet.ends_with('…'));
    }

    #[test]
    fn test_compose_no_results() {
        let en = compose("q", &[], Lang::En);
        assert!(en.is_empty());
        assert_eq!(en.text, "No results.");

        let zh = compose("退货", &[], Lang::Zh);
        assert_eq!(zh.heading, "回答");
        assert_eq!(zh.sources_heading, "引用来源");
        assert_eq!(zh.text, Lang::Zh.no_results());
    }
}
