use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{DocumentEncoder, DocumentError, DocumentKind, DocumentSpec};

/// 占位编码器：不生成真实的 OOXML，只把文档结构重新序列化为 JSON
///
/// 真正的 PPTX/DOCX/XLSX 编码器实现 [`DocumentEncoder`] 后注册到同一类型即可替换。
pub struct JsonEchoEncoder {
    kind: DocumentKind,
}

impl JsonEchoEncoder {
    pub fn new(kind: DocumentKind) -> Self {
        Self { kind }
    }

    fn note(&self) -> String {
        format!(
            "To enable {} generation, register a {} encoder with the relay",
            self.kind.as_tag().to_uppercase(),
            self.kind.as_tag()
        )
    }
}

#[derive(Serialize)]
struct EchoedStructure<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a Value>,
    #[serde(flatten)]
    body: Map<String, Value>,
    note: String,
}

impl DocumentEncoder for JsonEchoEncoder {
    fn encode(&self, spec: &DocumentSpec) -> Result<Bytes, DocumentError> {
        let mut body = Map::new();
        if let Some(field) = spec.kind().body_field() {
            if let Some(value) = spec.field(field) {
                body.insert(field.to_string(), value.clone());
            }
        }

        let structure = EchoedStructure {
            title: spec.field("title"),
            body,
            note: self.note(),
        };

        Ok(Bytes::from(serde_json::to_vec_pretty(&structure)?))
    }
}
