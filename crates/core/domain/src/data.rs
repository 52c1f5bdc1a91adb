use crate::geo::Coordinates;

/// 规范化后的点事件（一次真实世界观测）。
///
/// 只在解码成功时创建，之后不会被原地修改：同 key 的新事件整体替换旧事件。
#[derive(Debug, Clone, PartialEq)]
pub struct PointEvent {
    /// 实体标识（船舶 MMSI、站点 id）；雷击等一次性事件为 None。
    pub entity_key: Option<String>,
    pub coordinates: Coordinates,
    /// 入库时间（毫秒时间戳）。
    pub observed_at_ms: i64,
    pub attributes: EventAttributes,
}

impl PointEvent {
    pub fn keyed(
        entity_key: impl Into<String>,
        coordinates: Coordinates,
        observed_at_ms: i64,
        attributes: EventAttributes,
    ) -> Self {
        Self {
            entity_key: Some(entity_key.into()),
            coordinates,
            observed_at_ms,
            attributes,
        }
    }

    pub fn keyless(
        coordinates: Coordinates,
        observed_at_ms: i64,
        attributes: EventAttributes,
    ) -> Self {
        Self {
            entity_key: None,
            coordinates,
            observed_at_ms,
            attributes,
        }
    }

    /// 事件年龄（毫秒），时钟回拨时为 0。
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.observed_at_ms).max(0)
    }
}

/// 各数据源特有的属性。
#[derive(Debug, Clone, PartialEq)]
pub enum EventAttributes {
    Vessel(VesselAttributes),
    Strike(StrikeAttributes),
}

/// 船舶位置报告属性（AIS）。
#[derive(Debug, Clone, PartialEq)]
pub struct VesselAttributes {
    pub name: Option<String>,
    /// 对地航速（节）。
    pub sog: f64,
    /// 对地航向（度）。
    pub cog: f64,
    /// 真航向（度），上游 511 表示不可用。
    pub heading: Option<f64>,
}

/// 雷击属性。
#[derive(Debug, Clone, PartialEq)]
pub struct StrikeAttributes {
    pub amplitude: f64,
    pub station_count: u32,
}
