//! 표시 언어 (English / 中文)
//!
//! 답변 머리말, 안내 문구, 사용자용 에러 메시지를 언어별로 제공합니다.
//! 번역은 하지 않습니다.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// UI 언어
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Zh,
}

fn cjk_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x{4e00}-\x{9fff}]").expect("valid CJK regex"))
}

/// CJK 한자 포함 여부
pub fn has_cjk(text: &str) -> bool {
    cjk_regex().is_match(text)
}

impl Lang {
    /// 질문 텍스트로 언어 추정 (한자가 있으면 중국어)
    pub fn detect(text: &str) -> Self {
        if has_cjk(text) {
            Lang::Zh
        } else {
            Lang::En
        }
    }

    /// 명시된 언어가 없으면 질문에서 추정
    pub fn resolve(explicit: Option<Lang>, question: &str) -> Self {
        explicit.unwrap_or_else(|| Self::detect(question))
    }

    pub fn answer_heading(self) -> &'static str {
        match self {
            Lang::En => "Answer",
            Lang::Zh => "回答",
        }
    }

    pub fn sources_heading(self) -> &'static str {
        match self {
            Lang::En => "Sources",
            Lang::Zh => "引用来源",
        }
    }

    pub fn no_results(self) -> &'static str {
        match self {
            Lang::En => "No results.",
            Lang::Zh => "没有找到相关结果。",
        }
    }

    /// 빌드 완료 메시지
    pub fn build_done(self, files: usize, chunks: usize) -> String {
        match self {
            Lang::En => format!("Done. Files: {}, chunks: {}", files, chunks),
            Lang::Zh => format!("完成。文件：{}，分块：{}", files, chunks),
        }
    }

    /// 사용자용 에러 메시지
    pub fn error_message(self, err: &RagError) -> String {
        match (self, err) {
            (Lang::En, RagError::IndexEmpty) => {
                "Index is empty. Click Build / Rebuild Index first.".to_string()
            }
            (Lang::Zh, RagError::IndexEmpty) => "索引为空，请先点击“构建 / 重建索引”。".to_string(),
            (Lang::En, RagError::FolderNotFound(path)) => {
                format!("Folder not found: {}", path.display())
            }
            (Lang::Zh, RagError::FolderNotFound(path)) => {
                format!("找不到文件夹：{}", path.display())
            }
            (Lang::En, RagError::Configuration(msg)) => format!("Invalid settings: {}", msg),
            (Lang::Zh, RagError::Configuration(msg)) => format!("设置无效：{}", msg),
            (Lang::En, RagError::Store(msg)) => {
                format!("Vector store error (previous index kept): {}", msg)
            }
            (Lang::Zh, RagError::Store(msg)) => format!("向量库错误（已保留原索引）：{}", msg),
            (Lang::En, RagError::Embedding(msg) | RagError::ModelLoad(msg)) => {
                format!("Embedding model error: {}", msg)
            }
            (Lang::Zh, RagError::Embedding(msg) | RagError::ModelLoad(msg)) => {
                format!("嵌入模型错误：{}", msg)
            }
            (Lang::En, RagError::Load { path, reason }) => {
                format!("Could not read {}: {}", path.display(), reason)
            }
            (Lang::Zh, RagError::Load { path, reason }) => {
                format!("无法读取 {}：{}", path.display(), reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect() {
        assert_eq!(Lang::detect("What is the return policy?"), Lang::En);
        assert_eq!(Lang::detect("退货政策是什么？"), Lang::Zh);
        assert_eq!(Lang::detect("policy 退货"), Lang::Zh);
        assert_eq!(Lang::detect(""), Lang::En);
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        assert_eq!(Lang::resolve(Some(Lang::En), "退货政策"), Lang::En);
        assert_eq!(Lang::resolve(None, "退货政策"), Lang::Zh);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Lang::Zh).unwrap(), "\"zh\"");
        let lang: Lang = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(lang, Lang::En);
    }

    #[test]
    fn test_error_message_localized() {
        let err = RagError::FolderNotFound(PathBuf::from("docs"));
        assert!(Lang::En.error_message(&err).starts_with("Folder not found"));
        assert!(Lang::Zh.error_message(&err).starts_with("找不到文件夹"));
        assert!(Lang::En.error_message(&RagError::IndexEmpty).contains("Build"));
    }
}
