use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::{
    documents::{DocumentSpec, EncoderRegistry},
    models::ChatResponse,
};

pub const DEFAULT_DOCUMENT_REPLY: &str =
    "I've created your document. Click the download button below.";

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("json fence pattern"));

static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").expect("fence pattern"));

/// 尝试把回复解析为结构化文档描述
///
/// 先剥离 ```` ```json ```` 或 ```` ``` ```` 围栏，否则要求文本以 `{` 开头；
/// 解析失败或 `type` 不可识别时返回 `None`。
pub fn parse_document(text: &str) -> Option<DocumentSpec> {
    let candidate = match JSON_FENCE.captures(text).or_else(|| ANY_FENCE.captures(text)) {
        Some(caps) => caps.get(1)?.as_str(),
        None if text.trim_start().starts_with('{') => text.trim(),
        None => return None,
    };

    let value: Value = serde_json::from_str(candidate).ok()?;
    DocumentSpec::from_value(value)
}

pub fn extract_document(text: &str, encoders: &EncoderRegistry) -> ChatResponse {
    let Some(spec) = parse_document(text) else {
        return ChatResponse::text(text);
    };

    match encoders.generate(&spec) {
        Ok(file) => ChatResponse {
            content: spec
                .explanation()
                .unwrap_or(DEFAULT_DOCUMENT_REPLY)
                .to_string(),
            files: vec![file],
            artifacts: Vec::new(),
        },
        Err(err) => {
            warn!(target: "relay", kind = %spec.kind(), error = %err, "文档生成失败，回退为结构描述");
            ChatResponse::text(format!(
                "I created the document structure, but there was an error generating the file: {}. Here's the data structure:\n\n{}",
                err,
                spec.to_pretty_json()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::documents::DocumentKind;

    #[test]
    fn fenced_text_document_yields_one_file() {
        let reply = "```json\n{\"type\":\"text\",\"filename\":\"x.txt\",\"content\":\"hi\"}\n```";

        let response = extract_document(reply, &EncoderRegistry::default());

        assert_eq!(response.content, DEFAULT_DOCUMENT_REPLY);
        assert_eq!(response.files.len(), 1);
        assert_eq!(response.files[0].name, "x.txt");
        assert_eq!(response.files[0].data, "aGk=");
    }

    #[test]
    fn bare_json_uses_explanation() {
        let reply = r#"  {"type":"pptx","title":"AI Trends","slides":[],"explanation":"Made a deck"}"#;

        let response = extract_document(reply, &EncoderRegistry::default());

        assert_eq!(response.content, "Made a deck");
        assert_eq!(response.files[0].name, "AI_Trends.pptx");
        assert_eq!(
            response.files[0].mime_type,
            DocumentKind::Presentation.media_type()
        );
    }

    #[test]
    fn unfenced_prose_is_not_a_document() {
        assert!(parse_document("Sure! Here is {\"type\":\"text\"} inline").is_none());
        assert!(parse_document("```python\nprint('hi')\n```").is_none());
        assert!(parse_document("{not json").is_none());
    }

    #[test]
    fn unknown_type_passes_text_through() {
        let reply = r#"{"type":"pdf","title":"x"}"#;
        assert_eq!(
            extract_document(reply, &EncoderRegistry::default()),
            ChatResponse::text(reply)
        );
    }

    #[test]
    fn generation_failure_returns_structure_with_explanation() {
        let reply = r#"{"type":"text","filename":"a.csv"}"#;

        let response = extract_document(reply, &EncoderRegistry::default());

        assert!(response.files.is_empty());
        assert!(response.content.starts_with(
            "I created the document structure, but there was an error generating the file: document field \"content\" is missing or not a string."
        ));
        assert!(response.content.contains("\"filename\": \"a.csv\""));
    }
}
