//! 路由定义
//!
//! - 健康检查：/api/health
//! - 数据源快照：/api/ships, /api/storms
//! - 采集指标：/metrics

use super::handlers::*;
use super::{AppState, request_context};
use axum::{Router, middleware, routing::get};
use tower_http::cors::CorsLayer;

/// 创建完整路由（含请求追踪与跨域中间件）
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/ships", get(get_ships))
        .route("/api/storms", get(get_storms))
        .route("/metrics", get(get_metrics))
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
        .layer(CorsLayer::permissive())
}
