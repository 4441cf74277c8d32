use bytes::Bytes;

use super::{DocumentEncoder, DocumentError, DocumentSpec};

/// `text` 文档：`content` 原样写入文件
pub struct TextEncoder;

impl DocumentEncoder for TextEncoder {
    fn encode(&self, spec: &DocumentSpec) -> Result<Bytes, DocumentError> {
        let content = spec
            .str_field("content")
            .ok_or(DocumentError::MissingField("content"))?;
        Ok(Bytes::copy_from_slice(content.as_bytes()))
    }
}
