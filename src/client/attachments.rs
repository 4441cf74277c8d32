use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};
use futures_util::future::try_join_all;
use tokio::fs;

use crate::models::Attachment;

/// 按扩展名推断 MIME 类型，未知类型按二进制处理
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
}

pub async fn read_attachment(path: &Path) -> std::io::Result<Attachment> {
    let bytes = fs::read(path).await?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Attachment {
        name,
        mime_type: guess_mime_type(path).to_string(),
        size: bytes.len() as u64,
        data: STANDARD.encode(&bytes),
    })
}

/// 并发读取一批文件；任意一个失败则整批作废，不会产生部分附件
pub async fn read_attachments<P: AsRef<Path>>(paths: &[P]) -> std::io::Result<Vec<Attachment>> {
    try_join_all(paths.iter().map(|path| read_attachment(path.as_ref()))).await
}
