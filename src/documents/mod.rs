mod json_echo;
mod text;

pub use json_echo::JsonEchoEncoder;
pub use text::TextEncoder;

use std::{collections::HashMap, fmt, sync::Arc};

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::GeneratedFile;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("no encoder registered for {0} documents")]
    Unregistered(DocumentKind),

    #[error("document field \"{0}\" is missing or not a string")]
    MissingField(&'static str),

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Presentation,
    WordDocument,
    Spreadsheet,
    Text,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Presentation,
        DocumentKind::WordDocument,
        DocumentKind::Spreadsheet,
        DocumentKind::Text,
    ];

    pub fn from_tag(value: &str) -> Option<Self> {
        match value {
            "pptx" => Some(DocumentKind::Presentation),
            "docx" => Some(DocumentKind::WordDocument),
            "xlsx" => Some(DocumentKind::Spreadsheet),
            "text" => Some(DocumentKind::Text),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            DocumentKind::Presentation => "pptx",
            DocumentKind::WordDocument => "docx",
            DocumentKind::Spreadsheet => "xlsx",
            DocumentKind::Text => "text",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            DocumentKind::Presentation => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            DocumentKind::WordDocument => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            DocumentKind::Text => "text/plain",
        }
    }

    fn default_stem(&self) -> &'static str {
        match self {
            DocumentKind::Presentation => "presentation",
            DocumentKind::WordDocument => "document",
            DocumentKind::Spreadsheet => "spreadsheet",
            DocumentKind::Text => "file",
        }
    }

    /// 描述文档主体的数组字段
    pub fn body_field(&self) -> Option<&'static str> {
        match self {
            DocumentKind::Presentation => Some("slides"),
            DocumentKind::WordDocument => Some("sections"),
            DocumentKind::Spreadsheet => Some("sheets"),
            DocumentKind::Text => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

/// 模型返回的结构化文档描述，保留原始字段以便失败时原样回显
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSpec {
    kind: DocumentKind,
    fields: Map<String, Value>,
}

impl DocumentSpec {
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(fields) = value else {
            return None;
        };
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .and_then(DocumentKind::from_tag)?;

        Some(Self { kind, fields })
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    pub fn explanation(&self) -> Option<&str> {
        self.str_field("explanation").filter(|text| !text.is_empty())
    }

    pub fn file_name(&self) -> String {
        if self.kind == DocumentKind::Text {
            return self
                .str_field("filename")
                .filter(|name| !name.is_empty())
                .unwrap_or("file.txt")
                .to_string();
        }

        let stem = self
            .title()
            .filter(|title| !title.is_empty())
            .map(sanitize_stem)
            .unwrap_or_else(|| self.kind.default_stem().to_string());

        format!("{}.{}", stem, self.kind.as_tag())
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.fields).unwrap_or_default()
    }
}

fn sanitize_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// 按文档类型生成文件内容的能力
pub trait DocumentEncoder: Send + Sync {
    fn encode(&self, spec: &DocumentSpec) -> Result<Bytes, DocumentError>;
}

#[derive(Clone)]
pub struct EncoderRegistry {
    encoders: HashMap<DocumentKind, Arc<dyn DocumentEncoder>>,
}

impl EncoderRegistry {
    pub fn empty() -> Self {
        Self {
            encoders: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: DocumentKind, encoder: Arc<dyn DocumentEncoder>) {
        self.encoders.insert(kind, encoder);
    }

    pub fn generate(&self, spec: &DocumentSpec) -> Result<GeneratedFile, DocumentError> {
        let kind = spec.kind();
        let encoder = self
            .encoders
            .get(&kind)
            .ok_or(DocumentError::Unregistered(kind))?;
        let data = encoder.encode(spec)?;

        Ok(GeneratedFile {
            name: spec.file_name(),
            mime_type: kind.media_type().to_string(),
            data: STANDARD.encode(&data),
            generated: true,
        })
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for kind in DocumentKind::ALL {
            let encoder: Arc<dyn DocumentEncoder> = match kind {
                DocumentKind::Text => Arc::new(TextEncoder),
                other => Arc::new(JsonEchoEncoder::new(other)),
            };
            registry.register(kind, encoder);
        }
        registry
    }
}
