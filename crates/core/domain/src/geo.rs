//! WGS84 坐标与空间过滤。

/// 每度对应的公里数（平面近似）。
pub const KM_PER_DEGREE: f64 = 111.0;

/// 经纬度坐标（度）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinates {
    /// 校验后构造：必须为有限数且落在 WGS84 取值范围内。
    pub fn new(lon: f64, lat: f64) -> Option<Self> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        Some(Self { lon, lat })
    }

    /// 平面近似距离（公里）：`sqrt(Δlat² + Δlon²) × 111`。
    ///
    /// 不做纬度修正，东西向距离在高纬度会被高估。
    pub fn approx_distance_km(&self, other: &Coordinates) -> f64 {
        let dlat = self.lat - other.lat;
        let dlon = self.lon - other.lon;
        (dlat * dlat + dlon * dlon).sqrt() * KM_PER_DEGREE
    }
}

/// 轴对齐包围盒 `[lon_min, lat_min, lon_max, lat_max]`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    /// 校验后构造，失败时返回原因。
    pub fn new(lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) -> Result<Self, String> {
        let values = [lon_min, lat_min, lon_max, lat_max];
        if values.iter().any(|value| !value.is_finite()) {
            return Err("bbox values must be finite".to_string());
        }
        if Coordinates::new(lon_min, lat_min).is_none()
            || Coordinates::new(lon_max, lat_max).is_none()
        {
            return Err("bbox out of WGS84 range".to_string());
        }
        if lon_min > lon_max || lat_min > lat_max {
            return Err("bbox min must not exceed max".to_string());
        }
        Ok(Self {
            lon_min,
            lat_min,
            lon_max,
            lat_max,
        })
    }

    /// 解析 `lon_min,lat_min,lon_max,lat_max`。
    pub fn parse(value: &str) -> Result<Self, String> {
        let parts = value
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| format!("bbox is not numeric: {}", value))?;
        match parts.as_slice() {
            [lon_min, lat_min, lon_max, lat_max] => {
                Self::new(*lon_min, *lat_min, *lon_max, *lat_max)
            }
            _ => Err(format!("bbox needs 4 values: {}", value)),
        }
    }

    /// 边界包含在内。
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.lon_min <= point.lon
            && point.lon <= self.lon_max
            && self.lat_min <= point.lat
            && point.lat <= self.lat_max
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.lon_min, self.lat_min, self.lon_max, self.lat_max]
    }
}

/// 快照查询的空间过滤条件。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialFilter {
    BoundingBox(BoundingBox),
    /// 以 center 为圆心的平面近似半径过滤。
    Radius { center: Coordinates, radius_km: f64 },
}

impl SpatialFilter {
    pub fn matches(&self, point: &Coordinates) -> bool {
        match self {
            SpatialFilter::BoundingBox(bbox) => bbox.contains(point),
            SpatialFilter::Radius { center, radius_km } => {
                center.approx_distance_km(point) <= *radius_km
            }
        }
    }
}
