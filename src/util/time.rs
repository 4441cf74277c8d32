use chrono::{DateTime, Local};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

pub fn now_local() -> DateTime<Local> {
    Local::now()
}

pub fn format_local(now: &DateTime<Local>, pattern: &str) -> String {
    now.format(pattern).to_string()
}

/// 日志使用本地时区时间戳
pub struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", format_local(&now_local(), "%Y-%m-%d %H:%M:%S%:z"))
    }
}
