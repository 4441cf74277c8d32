use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::fs;
use uuid::Uuid;

use crate::{
    errors::{RelayError, Result},
    models::Attachment,
    util::{format_local, now_local},
};

/// 把回复中的生成文件解码后写入下载目录
pub struct DownloadWriter {
    root: PathBuf,
}

impl DownloadWriter {
    pub async fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(&self, file: &Attachment) -> Result<PathBuf> {
        let bytes = STANDARD
            .decode(file.data.trim())
            .map_err(|err| RelayError::other(format!("{} 不是合法的 base64: {}", file.name, err)))?;

        fs::create_dir_all(&self.root).await?;
        let file_name = safe_file_name(&file.name);
        let mut path = self.root.join(&file_name);

        // 同名文件已存在时追加时间戳和短 id
        if fs::try_exists(&path).await? {
            let (stem, extension) = split_extension(&file_name);
            let timestamp = format_local(&now_local(), "%Y%m%d_%H%M%S");
            let id = Uuid::new_v4();
            path = self.root.join(format!(
                "{}_{}_{}{}",
                stem,
                timestamp,
                &id.to_string()[..8],
                extension
            ));
        }

        fs::write(&path, &bytes).await?;
        Ok(path)
    }
}

fn safe_file_name(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty() && *part != "." && *part != "..")
        .unwrap_or("");

    if last.is_empty() {
        "download".to_string()
    } else {
        last.to_string()
    }
}

fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(index) if index > 0 => (&file_name[..index], &file_name[index..]),
        _ => (file_name, ""),
    }
}
