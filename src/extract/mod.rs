//! 模型回复的后处理：标签抽取与结构化文档抽取。
//!
//! 两种策略互不组合，每个路由只使用其中一种。

mod structured;
mod tags;

pub use structured::{DEFAULT_DOCUMENT_REPLY, extract_document, parse_document};
pub use tags::extract_tags;
