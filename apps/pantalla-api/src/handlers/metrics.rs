//! 采集指标快照。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pantalla_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            raw_messages: snapshot.raw_messages,
            decoded_events: snapshot.decoded_events,
            decode_failures: snapshot.decode_failures,
            store_upserts: snapshot.store_upserts,
            store_appends: snapshot.store_appends,
            evicted_events: snapshot.evicted_events,
            connection_attempts: snapshot.connection_attempts,
            connection_failures: snapshot.connection_failures,
            sessions_closed: snapshot.sessions_closed,
            snapshots_served: snapshot.snapshots_served,
            snapshot_features_total: snapshot.snapshot_features_total,
        })),
    )
        .into_response()
}
