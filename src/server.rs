use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::DEFAULT_MAX_BODY_BYTES,
    errors::{RelayError, Result},
    models::ChatResponse,
    relay::{Relay, RelayMode},
};

const ALLOWED_HEADERS: [&str; 9] = [
    "x-csrf-token",
    "x-requested-with",
    "accept",
    "accept-version",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "x-api-version",
];

#[derive(Clone)]
pub struct AppState {
    relay: Arc<Relay>,
    max_body_bytes: usize,
}

impl AppState {
    pub fn new(relay: Relay) -> Self {
        Self {
            relay: Arc::new(relay),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;

    Router::new()
        .route(
            RelayMode::Tagged.route(),
            post(chat_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed),
        )
        .route(
            RelayMode::Documents.route(),
            post(advanced_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// 接口本身没有会话或鉴权，跨域放开即可
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::OPTIONS,
            Method::PATCH,
            Method::DELETE,
            Method::POST,
            Method::PUT,
        ])
        .allow_headers(ALLOWED_HEADERS.map(HeaderName::from_static))
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target: "server", %addr, "Relay 服务已启动");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| RelayError::other(format!("Relay 服务器错误: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "server", "收到退出信号，准备关闭");
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> std::result::Result<Json<ChatResponse>, RelayError> {
    relay_request(&state, RelayMode::Tagged, body).await.map(Json)
}

async fn advanced_handler(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> std::result::Result<Json<ChatResponse>, RelayError> {
    relay_request(&state, RelayMode::Documents, body)
        .await
        .map(Json)
}

// 超出体积上限等读取失败同样以 `{error}` JSON 返回
async fn relay_request(
    state: &AppState,
    mode: RelayMode,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<ChatResponse> {
    let request_id = Uuid::new_v4();

    let result: Result<ChatResponse> = async {
        let body = body?;
        let request = Relay::parse_request(&body)?;
        info!(
            target: "relay",
            %request_id,
            route = mode.route(),
            messages = request.messages.len(),
            "收到对话请求"
        );
        state.relay.handle(mode, &request).await
    }
    .await;

    match &result {
        Ok(response) => info!(
            target: "relay",
            %request_id,
            files = response.files.len(),
            artifacts = response.artifacts.len(),
            "对话请求完成"
        ),
        Err(err) => warn!(
            target: "relay",
            %request_id,
            status = %err.status(),
            error = %err,
            "对话请求失败"
        ),
    }

    result
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}
