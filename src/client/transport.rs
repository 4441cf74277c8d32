use std::future::Future;

use reqwest::Client as HttpClient;
use thiserror::Error;

use crate::models::{ChatRequest, ChatResponse, ErrorBody};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("网络请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("响应解析失败: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Relay 返回错误 ({status}): {message}")]
    Relay { status: u16, message: String },
}

/// 向 Relay 发送一次完整对话
pub trait RelayTransport {
    fn send(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, ClientError>> + Send;
}

#[derive(Clone)]
pub struct HttpRelay {
    http_client: HttpClient,
    url: String,
}

impl HttpRelay {
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        let http_client = HttpClient::builder()
            .user_agent("ChatPortal/0.1")
            .build()?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RelayTransport for HttpRelay {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let response = self.http_client.post(&self.url).json(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        // 出错时 Relay 总是返回 {"error": ...}
        if let Ok(ErrorBody { error }) = serde_json::from_slice::<ErrorBody>(&body) {
            return Err(ClientError::Relay {
                status: status.as_u16(),
                message: error,
            });
        }
        if !status.is_success() {
            return Err(ClientError::Relay {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
