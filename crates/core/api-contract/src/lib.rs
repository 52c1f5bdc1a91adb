//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// GeoJSON FeatureCollection（仪表盘地图图层直接消费，不做 ApiResponse 封装）。
#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }

    /// 数据源关闭时的空结果。
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// GeoJSON Feature（仅 Point 几何）。
#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: FeatureProperties,
}

impl Feature {
    pub fn point(lon: f64, lat: f64, properties: FeatureProperties) -> Self {
        Self {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: [lon, lat],
            },
            properties,
        }
    }
}

/// GeoJSON Point，坐标顺序为 `[lon, lat]`。
#[derive(Debug, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: [f64; 2],
}

/// 各数据源的 Feature 属性。
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FeatureProperties {
    Vessel(VesselProperties),
    Strike(StrikeProperties),
}

/// 船舶属性。
#[derive(Debug, Serialize)]
pub struct VesselProperties {
    pub name: String,
    pub mmsi: String,
    pub sog: f64,
    pub cog: f64,
    pub heading: Option<f64>,
    pub ts: i64,
}

/// 雷击属性。
#[derive(Debug, Serialize)]
pub struct StrikeProperties {
    pub ts: i64,
    pub amplitude: f64,
    pub station_count: u32,
}

/// 快照查询参数（覆盖配置默认值）。
#[derive(Debug, Default, Deserialize)]
pub struct SnapshotQueryParams {
    pub ttl_seconds: Option<u64>,
    pub max_points: Option<usize>,
    /// `lon_min,lat_min,lon_max,lat_max`
    pub bbox: Option<String>,
}

/// 健康检查返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub status: String,
    pub uptime_seconds: u64,
    pub feeds: Vec<FeedHealthDto>,
}

/// 单个数据源的健康状态。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedHealthDto {
    pub feed: String,
    pub enabled: bool,
    pub state: String,
    pub count: usize,
    pub last_error: Option<String>,
    pub streaming_since_ms: Option<i64>,
}

/// 采集指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub raw_messages: u64,
    pub decoded_events: u64,
    pub decode_failures: u64,
    pub store_upserts: u64,
    pub store_appends: u64,
    pub evicted_events: u64,
    pub connection_attempts: u64,
    pub connection_failures: u64,
    pub sessions_closed: u64,
    pub snapshots_served: u64,
    pub snapshot_features_total: u64,
}
