use chat_portal::{
    config::AppConfig,
    errors::Result,
    relay::Relay,
    server::{AppState, run_server},
    util::init_tracing,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing("info");

    let config = AppConfig::load()?;
    let bind_addr = config.server.bind_addr;
    let max_body_bytes = config.server.max_body_bytes;

    let relay = Relay::new(config.anthropic)?;
    if !relay.has_api_key() {
        warn!(target: "server", "未配置 ANTHROPIC_API_KEY，所有对话请求都会返回 500");
    }
    info!(target: "server", model = relay.model(), "上游模型");

    run_server(
        bind_addr,
        AppState::new(relay).with_body_limit(max_body_bytes),
    )
    .await
}
