use serde_json::Value;

use crate::{
    config::AnthropicConfig,
    documents::EncoderRegistry,
    errors::{RelayError, Result},
    extract::{extract_document, extract_tags},
    models::{ChatRequest, ChatResponse, Message},
    providers::AnthropicClient,
};

/// `/api/chat-advanced` 使用的系统提示词，约束模型在创建文档时只输出结构化 JSON
pub const DOCUMENT_SYSTEM_PROMPT: &str = r#"You are an AI assistant with document generation capabilities.

When users ask you to create documents, you can generate:
- PowerPoint presentations (.pptx)
- Word documents (.docx)
- Excel spreadsheets (.xlsx)
- Text-based files (JSON, CSV, HTML, etc.)

IMPORTANT: When creating documents, respond with STRUCTURED JSON in this exact format:

For PowerPoint presentations:
{
  "type": "pptx",
  "title": "Presentation Title",
  "slides": [
    {
      "title": "Slide 1 Title",
      "content": ["Bullet point 1", "Bullet point 2"],
      "notes": "Speaker notes (optional)"
    }
  ],
  "explanation": "Brief explanation of what you created"
}

For Word documents:
{
  "type": "docx",
  "title": "Document Title",
  "sections": [
    {
      "heading": "Section 1",
      "content": "Paragraph text here...",
      "level": 1
    }
  ],
  "explanation": "Brief explanation"
}

For Excel spreadsheets:
{
  "type": "xlsx",
  "title": "Spreadsheet Name",
  "sheets": [
    {
      "name": "Sheet1",
      "data": [
        ["Header1", "Header2", "Header3"],
        ["Data1", "Data2", "Data3"]
      ]
    }
  ],
  "explanation": "Brief explanation"
}

For simple text files (JSON, CSV, TXT, etc.):
{
  "type": "text",
  "filename": "file.json",
  "content": "file content here",
  "explanation": "Brief explanation"
}

ALWAYS respond with valid JSON when creating documents. NO markdown, NO extra text, ONLY JSON.

Examples:
User: "Create a PowerPoint about AI trends"
Assistant: {"type":"pptx","title":"AI Trends 2024","slides":[{"title":"Introduction","content":["AI is transforming industries","Key trends emerging"]}],"explanation":"Created a 5-slide presentation on current AI trends"}

User: "Make a sales report in Excel"
Assistant: {"type":"xlsx","title":"Sales Report","sheets":[{"name":"Q1 Sales","data":[["Product","Sales","Revenue"],["Product A",100,5000]]}],"explanation":"Created a sales report spreadsheet"}

For regular conversations (not document creation), respond normally without JSON."#;

/// 回复后处理策略，每个路由固定一种
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// `<file>` / `<artifact>` 标签抽取
    Tagged,
    /// 结构化 JSON 文档生成
    Documents,
}

impl RelayMode {
    pub fn route(&self) -> &'static str {
        match self {
            RelayMode::Tagged => "/api/chat",
            RelayMode::Documents => "/api/chat-advanced",
        }
    }

    pub fn system_prompt(&self) -> Option<&'static str> {
        match self {
            RelayMode::Tagged => None,
            RelayMode::Documents => Some(DOCUMENT_SYSTEM_PROMPT),
        }
    }
}

pub struct Relay {
    config: AnthropicConfig,
    client: AnthropicClient,
    encoders: EncoderRegistry,
}

impl Relay {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = AnthropicClient::from_config(&config)?;
        Ok(Self {
            config,
            client,
            encoders: EncoderRegistry::default(),
        })
    }

    pub fn with_encoders(mut self, encoders: EncoderRegistry) -> Self {
        self.encoders = encoders;
        self
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// 请求体必须是带 `messages` 数组的 JSON 对象，其他情况一律视为 400
    pub fn parse_request(body: &[u8]) -> Result<ChatRequest> {
        let mut value: Value = serde_json::from_slice(body).map_err(|_| RelayError::InvalidBody)?;
        let messages = value
            .get_mut("messages")
            .filter(|messages| messages.is_array())
            .map(Value::take)
            .ok_or(RelayError::InvalidBody)?;
        let messages: Vec<Message> =
            serde_json::from_value(messages).map_err(|_| RelayError::InvalidBody)?;

        Ok(ChatRequest { messages })
    }

    pub async fn handle(&self, mode: RelayMode, request: &ChatRequest) -> Result<ChatResponse> {
        let api_key = self.config.require_api_key()?;
        let max_tokens = match mode {
            RelayMode::Tagged => self.config.chat_max_tokens,
            RelayMode::Documents => self.config.advanced_max_tokens,
        };

        let reply = self
            .client
            .complete(api_key, mode.system_prompt(), max_tokens, &request.messages)
            .await?;

        Ok(match mode {
            RelayMode::Tagged => extract_tags(&reply),
            RelayMode::Documents => extract_document(&reply, &self.encoders),
        })
    }
}
