use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Artifact, ChatResponse, GeneratedFile};

// 非贪婪、可跨行；嵌套或不闭合的标签切分边界不做保证
static FILE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<file\s+name="([^"]*)"\s+type="([^"]*)"\s*>(.*?)</file>"#)
        .expect("file tag pattern")
});

static ARTIFACT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<artifact\s+title="([^"]*)"(?:\s+language="([^"]*)")?\s*>(.*?)</artifact>"#)
        .expect("artifact tag pattern")
});

/// 从回复中抽取 `<file>` 与 `<artifact>` 块，并从展示文本中移除
///
/// 没有任何标签时原文不做任何修改。
pub fn extract_tags(text: &str) -> ChatResponse {
    let files: Vec<GeneratedFile> = FILE_TAG
        .captures_iter(text)
        .map(|caps| GeneratedFile {
            name: caps[1].to_string(),
            mime_type: caps[2].to_string(),
            data: caps[3].trim().to_string(),
            generated: true,
        })
        .collect();

    let artifacts: Vec<Artifact> = ARTIFACT_TAG
        .captures_iter(text)
        .map(|caps| Artifact {
            title: caps[1].to_string(),
            language: caps
                .get(2)
                .map(|m| m.as_str())
                .filter(|lang| !lang.is_empty())
                .unwrap_or("text")
                .to_string(),
            content: caps[3].trim_matches(['\r', '\n']).to_string(),
        })
        .collect();

    if files.is_empty() && artifacts.is_empty() {
        return ChatResponse::text(text);
    }

    let without_files = FILE_TAG.replace_all(text, "");
    let cleaned = ARTIFACT_TAG.replace_all(&without_files, "");

    ChatResponse {
        content: cleaned.trim().to_string(),
        files,
        artifacts,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn text_without_tags_passes_through_unchanged() {
        let text = "  plain reply\nwith <b>html</b> and trailing space  ";

        let response = extract_tags(text);

        assert_eq!(response, ChatResponse::text(text));
    }

    #[test]
    fn file_tag_is_extracted_and_stripped() {
        let response = extract_tags("<file name=\"a.txt\" type=\"text/plain\">aGVsbG8=\n</file>done");

        assert_eq!(response.content, "done");
        assert_eq!(
            response.files,
            vec![GeneratedFile {
                name: "a.txt".into(),
                mime_type: "text/plain".into(),
                data: "aGVsbG8=".into(),
                generated: true,
            }]
        );
        assert!(response.artifacts.is_empty());
    }

    #[test]
    fn artifact_language_defaults_to_text() {
        let response = extract_tags(
            "Here you go:\n<artifact title=\"Notes\">\nline one\nline two\n</artifact>\nEnjoy.",
        );

        assert_eq!(response.content, "Here you go:\n\nEnjoy.");
        assert_eq!(
            response.artifacts,
            vec![Artifact {
                title: "Notes".into(),
                language: "text".into(),
                content: "line one\nline two".into(),
            }]
        );
    }

    #[test]
    fn mixed_tags_keep_their_order() {
        let text = concat!(
            "<artifact title=\"main\" language=\"rust\">fn main() {}</artifact>\n",
            "<file name=\"one.csv\" type=\"text/csv\">YSxi</file>\n",
            "<file name=\"two.csv\" type=\"text/csv\">Yyxk</file>\n",
            "<artifact title=\"lib\" language=\"rust\">pub fn f() {}</artifact>"
        );

        let response = extract_tags(text);

        assert_eq!(response.content, "");
        let names: Vec<_> = response.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["one.csv", "two.csv"]);
        let titles: Vec<_> = response.artifacts.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["main", "lib"]);
        assert_eq!(response.artifacts[0].language, "rust");
    }

    #[test]
    fn unclosed_tag_is_left_in_text() {
        let text = "<file name=\"a.txt\" type=\"text/plain\">aGk=";
        assert_eq!(extract_tags(text), ChatResponse::text(text));
    }
}
