mod time;

pub use time::{LocalTimer, format_local, now_local};

use tracing::info;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` 优先，否则使用给定的默认级别
pub fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_timer(LocalTimer)
        .init();

    info!("tracing initialized");
}
