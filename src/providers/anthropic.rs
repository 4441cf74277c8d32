use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    config::AnthropicConfig,
    errors::{RelayError, Result},
    models::{Attachment, Message, Role},
};

const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Anthropic Messages API 客户端
///
/// 每次调用只发出一个请求，不做重试；非 2xx 响应按原状态码透传给调用方。
///
/// ```ignore
/// let client = AnthropicClient::from_config(&config.anthropic)?;
/// let reply = client
///     .complete(api_key, None, 1024, &request.messages)
///     .await?;
/// ```
#[derive(Clone)]
pub struct AnthropicClient {
    http_client: HttpClient,
    api_url: String,
    model: String,
    api_version: String,
}

impl AnthropicClient {
    pub fn from_config(config: &AnthropicConfig) -> Result<Self> {
        let mut builder = HttpClient::builder().user_agent("ChatPortal/0.1");
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_version: config.api_version.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(
        &self,
        api_key: &str,
        system: Option<&str>,
        max_tokens: u32,
        messages: &[Message],
    ) -> Result<String> {
        let formatted = format_messages(messages);
        let payload = AnthropicRequest {
            model: &self.model,
            max_tokens,
            system,
            messages: &formatted,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.api_version)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(target: "upstream", %status, body = %body, "Anthropic API 请求失败");
            return Err(RelayError::upstream(status));
        }

        let reply: AnthropicResponse = response.json().await?;
        if let Some(usage) = &reply.usage {
            debug!(
                target: "upstream",
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "token 用量"
            );
        }

        reply
            .first_text()
            .ok_or_else(|| RelayError::other("Anthropic API 返回结果中没有文本内容"))
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

/// 将对话历史转换为上游要求的格式，顺序和角色保持不变
pub fn format_messages(messages: &[Message]) -> Vec<AnthropicMessage<'_>> {
    messages
        .iter()
        .map(|msg| {
            let content = match msg.role {
                Role::User if !msg.files.is_empty() => {
                    let mut blocks = Vec::with_capacity(msg.files.len() + 1);
                    blocks.push(ContentBlock::Text { text: &msg.content });
                    blocks.extend(msg.files.iter().filter_map(attachment_block));
                    AnthropicContent::Blocks(blocks)
                }
                _ => AnthropicContent::Text(&msg.content),
            };

            AnthropicMessage {
                role: msg.role.as_str(),
                content,
            }
        })
        .collect()
}

// 仅识别图片与 PDF，其余类型直接丢弃
fn attachment_block(file: &Attachment) -> Option<ContentBlock<'_>> {
    if file.mime_type.starts_with("image/") {
        Some(ContentBlock::Image {
            source: Base64Source::new(&file.mime_type, &file.data),
        })
    } else if file.mime_type == PDF_MEDIA_TYPE {
        Some(ContentBlock::Document {
            source: Base64Source::new(PDF_MEDIA_TYPE, &file.data),
        })
    } else {
        None
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [AnthropicMessage<'a>],
}

#[derive(Debug, Serialize)]
pub struct AnthropicMessage<'a> {
    pub role: &'static str,
    pub content: AnthropicContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnthropicContent<'a> {
    Text(&'a str),
    Blocks(Vec<ContentBlock<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock<'a> {
    Text { text: &'a str },
    Image { source: Base64Source<'a> },
    Document { source: Base64Source<'a> },
}

#[derive(Debug, Serialize)]
pub struct Base64Source<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

impl<'a> Base64Source<'a> {
    fn new(media_type: &'a str, data: &'a str) -> Self {
        Self {
            kind: "base64",
            media_type,
            data,
        }
    }
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

impl AnthropicResponse {
    fn first_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
    }
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}
