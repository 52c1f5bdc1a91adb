//! 健康检查：进程运行时长与各数据源连接状态。
//!
//! - GET /api/health

use api_contract::HealthDto;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::AppState;

pub async fn health(State(state): State<AppState>) -> Response {
    let dto = HealthDto {
        status: "ok".to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        feeds: vec![state.ships.health(), state.storms.health()],
    };
    (StatusCode::OK, Json(dto)).into_response()
}

