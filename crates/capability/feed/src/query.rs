use api_contract::SnapshotQueryParams;
use domain::{BoundingBox, SpatialFilter};

/// 快照查询错误（调用方参数非法，直接返回给调用方）。
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// 快照查询参数。
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_points: usize,
    pub filter: Option<SpatialFilter>,
}

impl FeedQuery {
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.ttl_seconds == 0 {
            return Err(FeedError::InvalidQuery(
                "ttl_seconds must be positive".to_string(),
            ));
        }
        if self.max_points == 0 {
            return Err(FeedError::InvalidQuery(
                "max_points must be positive".to_string(),
            ));
        }
        match self.filter {
            Some(SpatialFilter::BoundingBox(bbox)) => {
                BoundingBox::new(bbox.lon_min, bbox.lat_min, bbox.lon_max, bbox.lat_max)
                    .map_err(FeedError::InvalidQuery)?;
            }
            Some(SpatialFilter::Radius { radius_km, .. }) => {
                if !radius_km.is_finite() || radius_km <= 0.0 {
                    return Err(FeedError::InvalidQuery(format!(
                        "radius_km must be positive: {}",
                        radius_km
                    )));
                }
            }
            None => {}
        }
        Ok(())
    }

    pub fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl_seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000)
    }

    /// 叠加请求参数；bbox 覆盖时替换原有的空间过滤，max_points 以配置值为上限。
    pub fn with_overrides(&self, params: &SnapshotQueryParams) -> Result<Self, FeedError> {
        let mut query = self.clone();
        if let Some(ttl_seconds) = params.ttl_seconds {
            query.ttl_seconds = ttl_seconds;
        }
        // 只能收紧，不能超过配置上限
        if let Some(max_points) = params.max_points {
            query.max_points = max_points.min(self.max_points);
        }
        if let Some(bbox) = params.bbox.as_deref() {
            let bbox = BoundingBox::parse(bbox).map_err(FeedError::InvalidQuery)?;
            query.filter = Some(SpatialFilter::BoundingBox(bbox));
        }
        query.validate()?;
        Ok(query)
    }
}
