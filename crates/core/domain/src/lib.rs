pub mod clock;
pub mod data;
pub mod geo;

pub use clock::{Clock, ManualClock, SystemClock, now_epoch_ms};
pub use data::{EventAttributes, PointEvent, StrikeAttributes, VesselAttributes};
pub use geo::{BoundingBox, Coordinates, KM_PER_DEGREE, SpatialFilter};

/// 数据源标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// 船舶交通（AIS）。
    Ships,
    /// 大气电活动（雷击）。
    Storms,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Ships => "ships",
            FeedKind::Storms => "storms",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个数据源的连接状态（由连接监管器持有）。
///
/// - `Idle`：未启动或已停机
/// - `Connecting`：握手中
/// - `Streaming`：已连接，正在接收
/// - `Failed`：上次会话失败，等待退避后重连
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Streaming,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Failed => "failed",
        }
    }

    /// 是否已有在途的连接任务。
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Idle)
    }
}
