//! 聊天客户端：会话状态机、附件读取、Relay 传输与生成文件下载。

mod attachments;
mod downloads;
mod session;
mod transport;

pub use attachments::{guess_mime_type, read_attachment, read_attachments};
pub use downloads::DownloadWriter;
pub use session::{APOLOGY_MESSAGE, ChatSession, SendState, Submit, SubmitRejection};
pub use transport::{ClientError, HttpRelay, RelayTransport};
