use std::{
    env,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use ::config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/portal.toml";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
/// base64 附件会膨胀约三分之一，默认上限留足几张照片或 PDF 的余量
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;
const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_API_VERSION: &str = "2023-06-01";
const DEFAULT_CHAT_MAX_TOKENS: u32 = 1024;
const DEFAULT_ADVANCED_MAX_TOKENS: u32 = 4096;
const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000/api/chat";
const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,
}

#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// 缺失时服务仍会启动，但每个对话请求都会返回 500
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub api_version: String,
    pub chat_max_tokens: u32,
    pub advanced_max_tokens: u32,
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub relay_url: String,
    pub download_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub anthropic: AnthropicConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            env::var("PORTAL_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::load_from(
            Path::new(&config_path),
            Environment::with_prefix("PORTAL")
                .prefix_separator("_")
                .separator("__"),
            env::var(API_KEY_ENV).ok(),
        )
    }

    /// 依次叠加配置文件、`PORTAL_*` 环境变量，最后用 `ANTHROPIC_API_KEY` 补齐密钥
    pub fn load_from(
        config_path: &Path,
        environment: Environment,
        fallback_api_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let file_config: FileConfig = Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("读取配置 {:?} 失败", config_path))?
            .try_deserialize()
            .with_context(|| format!("解析配置 {:?} 失败", config_path))?;

        let server = file_config.server.unwrap_or_default().into_domain()?;
        let anthropic = file_config
            .anthropic
            .unwrap_or_default()
            .into_domain(fallback_api_key);
        let client = file_config.client.unwrap_or_default().into_domain();

        Ok(Self {
            server,
            anthropic,
            client,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: Option<FileServerConfig>,
    #[serde(default)]
    anthropic: Option<FileAnthropicConfig>,
    #[serde(default)]
    client: Option<FileClientConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct FileServerConfig {
    #[serde(default)]
    bind_addr: Option<String>,
    #[serde(default)]
    max_body_bytes: Option<usize>,
}

impl FileServerConfig {
    fn into_domain(self) -> anyhow::Result<ServerConfig> {
        let bind_addr_str = self
            .bind_addr
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .with_context(|| format!("解析 server.bind_addr 失败: {}", bind_addr_str))?;

        Ok(ServerConfig {
            bind_addr,
            max_body_bytes: self
                .max_body_bytes
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
        })
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileAnthropicConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    chat_max_tokens: Option<u32>,
    #[serde(default)]
    advanced_max_tokens: Option<u32>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl FileAnthropicConfig {
    fn into_domain(self, fallback_api_key: Option<String>) -> AnthropicConfig {
        let api_key = self
            .api_key
            .or(fallback_api_key)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        AnthropicConfig {
            api_key,
            api_url: self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            chat_max_tokens: self.chat_max_tokens.unwrap_or(DEFAULT_CHAT_MAX_TOKENS),
            advanced_max_tokens: self
                .advanced_max_tokens
                .unwrap_or(DEFAULT_ADVANCED_MAX_TOKENS),
            timeout: self
                .timeout_seconds
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileClientConfig {
    #[serde(default)]
    relay_url: Option<String>,
    #[serde(default)]
    download_dir: Option<String>,
}

impl FileClientConfig {
    fn into_domain(self) -> ClientConfig {
        ClientConfig {
            relay_url: self
                .relay_url
                .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            download_dir: PathBuf::from(
                self.download_dir
                    .unwrap_or_else(|| DEFAULT_DOWNLOAD_DIR.to_string()),
            ),
        }
    }
}

impl AnthropicConfig {
    pub fn require_api_key(&self) -> crate::errors::Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(crate::errors::RelayError::MissingConfig(API_KEY_ENV))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
            anthropic: FileAnthropicConfig::default().into_domain(None),
            client: FileClientConfig::default().into_domain(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("PORTAL")
            .prefix_separator("_")
            .separator("__")
            .source(Some(map))
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let config =
            AppConfig::load_from(Path::new("does/not/exist.toml"), env_from(&[]), None).unwrap();

        assert_eq!(config.server.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.server.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.anthropic.api_key, None);
        assert_eq!(config.anthropic.chat_max_tokens, 1024);
        assert_eq!(config.anthropic.advanced_max_tokens, 4096);
        assert_eq!(config.anthropic.timeout, None);
        assert_eq!(config.client.relay_url, DEFAULT_RELAY_URL);
    }

    #[test]
    fn env_overrides_and_fallback_key() {
        let config = AppConfig::load_from(
            Path::new("does/not/exist.toml"),
            env_from(&[
                ("PORTAL_SERVER__BIND_ADDR", "0.0.0.0:8080"),
                ("PORTAL_ANTHROPIC__MODEL", "claude-test"),
                ("PORTAL_SERVER__MAX_BODY_BYTES", "1048576"),
            ]),
            Some("sk-fallback".to_string()),
        )
        .unwrap();

        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.server.max_body_bytes, 1024 * 1024);
        assert_eq!(config.anthropic.model, "claude-test");
        assert_eq!(config.anthropic.require_api_key().unwrap(), "sk-fallback");
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = AppConfig::load_from(
            Path::new("does/not/exist.toml"),
            env_from(&[]),
            Some("   ".to_string()),
        )
        .unwrap();

        assert!(config.anthropic.require_api_key().is_err());
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.toml");
        std::fs::write(
            &path,
            "[anthropic]\napi_key = \"sk-file\"\ntimeout_seconds = 30\n\n[client]\ndownload_dir = \"out\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path, env_from(&[]), Some("sk-env".into())).unwrap();

        assert_eq!(config.anthropic.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.anthropic.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.client.download_dir, PathBuf::from("out"));
    }

    #[test]
    fn malformed_bind_addr_is_rejected() {
        let result = AppConfig::load_from(
            Path::new("does/not/exist.toml"),
            env_from(&[("PORTAL_SERVER__BIND_ADDR", "not-an-addr")]),
            None,
        );

        assert!(result.is_err());
    }
}
