use tracing::warn;

use super::transport::{ClientError, RelayTransport};
use crate::models::{Attachment, ChatRequest, ChatResponse, Message};

pub const APOLOGY_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    Sending,
    ErrorDisplayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    /// 输入为空且没有附件
    Empty,
    /// 上一次发送尚未结束
    InFlight,
}

#[derive(Debug)]
pub enum Submit {
    Ready(ChatSession, ChatRequest),
    Ignored(ChatSession, SubmitRejection),
}

/// 单个聊天会话的全部状态
///
/// 每个事件处理函数都消费旧状态并返回新状态，会话只有一个写入者。
/// 历史只追加，直到 [`ChatSession::clear`] 整体丢弃。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSession {
    history: Vec<Message>,
    input: String,
    pending: Vec<Attachment>,
    state: SendState,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn pending_attachments(&self) -> &[Attachment] {
        &self.pending
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    /// 整批追加附件；批次只在全部文件读取成功后才会传进来
    pub fn attach(mut self, batch: Vec<Attachment>) -> Self {
        self.pending.extend(batch);
        self
    }

    pub fn remove_attachment(mut self, index: usize) -> Self {
        if index < self.pending.len() {
            self.pending.remove(index);
        }
        self
    }

    pub fn clear(mut self) -> Self {
        self.history.clear();
        self.pending.clear();
        self
    }

    pub fn dismiss_error(mut self) -> Self {
        if self.state == SendState::ErrorDisplayed {
            self.state = SendState::Idle;
        }
        self
    }

    pub fn begin_send(mut self) -> Submit {
        if self.state == SendState::Sending {
            return Submit::Ignored(self, SubmitRejection::InFlight);
        }
        if self.input.trim().is_empty() && self.pending.is_empty() {
            return Submit::Ignored(self, SubmitRejection::Empty);
        }

        let content = std::mem::take(&mut self.input);
        let files = std::mem::take(&mut self.pending);
        self.history.push(Message::user(content, files));
        self.state = SendState::Sending;

        let request = ChatRequest {
            messages: self.history.clone(),
        };
        Submit::Ready(self, request)
    }

    pub fn finish_send(mut self, result: Result<ChatResponse, ClientError>) -> Self {
        match result {
            Ok(response) => {
                let mut reply = Message::assistant(response.content);
                reply.files = response.files.into_iter().map(Attachment::from).collect();
                reply.artifacts = response.artifacts;
                self.history.push(reply);
                self.state = SendState::Idle;
            }
            Err(err) => {
                warn!(target: "client", error = %err, "发送失败");
                self.history.push(Message::assistant(APOLOGY_MESSAGE));
                self.state = SendState::ErrorDisplayed;
            }
        }
        self
    }

    /// 发送当前输入并等待回复；被拒绝时返回原因且会话不变
    pub async fn send<T: RelayTransport>(
        self,
        transport: &T,
    ) -> (Self, Option<SubmitRejection>) {
        match self.begin_send() {
            Submit::Ready(session, request) => {
                let result = transport.send(&request).await;
                (session.finish_send(result), None)
            }
            Submit::Ignored(session, reason) => (session, Some(reason)),
        }
    }
}
