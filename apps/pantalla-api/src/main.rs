//! 实时地图数据服务：船舶（AIS）与雷电两个数据源的快照 API。

mod feeds;
mod handlers;
mod routes;
mod utils;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use pantalla_config::AppConfig;
use pantalla_feed::Feed;
use pantalla_ingest::{Backoff, install_crypto_provider};
use pantalla_telemetry::{init_tracing, new_request_ids};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, warn};

/// 请求处理上下文：每个数据源一个显式持有的实例。
#[derive(Clone)]
pub struct AppState {
    pub ships: Arc<Feed>,
    pub storms: Arc<Feed>,
    pub started_at: Instant,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();
    // wss:// 握手前安装 TLS 加密后端
    install_crypto_provider();

    let backoff = Backoff::new(
        config.supervisor.min_backoff(),
        config.supervisor.max_backoff(),
    );
    let state = AppState {
        ships: Arc::new(feeds::ships_feed(&config.ships, backoff)?),
        storms: Arc::new(feeds::storms_feed(&config.storm, backoff)),
        started_at: Instant::now(),
    };
    info!(
        target: "pantalla.feed",
        ships_enabled = config.ships.enabled,
        storms_enabled = config.storm.enabled,
        "feeds_configured"
    );

    let app = routes::create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(addr = %config.http_addr, "http_listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP 停止后关闭所有采集连接
    state.ships.shutdown().await;
    state.storms.shutdown().await;
    info!("shutdown_complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown_signal_received");
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id 与 trace_id，并注入请求扩展与日志
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}
