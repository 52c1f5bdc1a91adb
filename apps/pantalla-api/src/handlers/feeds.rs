//! 数据源快照接口。
//!
//! - GET /api/ships
//! - GET /api/storms
//!
//! 返回 GeoJSON FeatureCollection；可选参数 `ttl_seconds`、`max_points`、`bbox`
//! 覆盖配置默认值。只读内存窗口，不等待上游连接。

use api_contract::SnapshotQueryParams;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pantalla_feed::{Feed, FeedError};

use crate::AppState;
use crate::utils::response::invalid_query_error;

pub async fn get_ships(
    State(state): State<AppState>,
    params: Result<Query<SnapshotQueryParams>, QueryRejection>,
) -> Response {
    snapshot(&state.ships, params)
}

pub async fn get_storms(
    State(state): State<AppState>,
    params: Result<Query<SnapshotQueryParams>, QueryRejection>,
) -> Response {
    snapshot(&state.storms, params)
}

fn snapshot(feed: &Feed, params: Result<Query<SnapshotQueryParams>, QueryRejection>) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return invalid_query_error(rejection.body_text()),
    };
    match feed.snapshot_with(&params) {
        Ok(collection) => (StatusCode::OK, Json(collection)).into_response(),
        Err(FeedError::InvalidQuery(message)) => invalid_query_error(message),
    }
}
