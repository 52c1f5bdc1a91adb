//! 追踪、请求 ID 与采集指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 采集指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
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

/// 采集指标（进程级计数器）。
pub struct TelemetryMetrics {
    raw_messages: AtomicU64,
    decoded_events: AtomicU64,
    decode_failures: AtomicU64,
    store_upserts: AtomicU64,
    store_appends: AtomicU64,
    evicted_events: AtomicU64,
    connection_attempts: AtomicU64,
    connection_failures: AtomicU64,
    sessions_closed: AtomicU64,
    snapshots_served: AtomicU64,
    snapshot_features_total: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            raw_messages: AtomicU64::new(0),
            decoded_events: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            store_upserts: AtomicU64::new(0),
            store_appends: AtomicU64::new(0),
            evicted_events: AtomicU64::new(0),
            connection_attempts: AtomicU64::new(0),
            connection_failures: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            snapshots_served: AtomicU64::new(0),
            snapshot_features_total: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            raw_messages: self.raw_messages.load(Ordering::Relaxed),
            decoded_events: self.decoded_events.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            store_upserts: self.store_upserts.load(Ordering::Relaxed),
            store_appends: self.store_appends.load(Ordering::Relaxed),
            evicted_events: self.evicted_events.load(Ordering::Relaxed),
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            snapshots_served: self.snapshots_served.load(Ordering::Relaxed),
            snapshot_features_total: self.snapshot_features_total.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录上游原始消息接收次数。
pub fn record_raw_message() {
    metrics().raw_messages.fetch_add(1, Ordering::Relaxed);
}

/// 记录解码成功次数。
pub fn record_decoded_event() {
    metrics().decoded_events.fetch_add(1, Ordering::Relaxed);
}

/// 记录解码失败（消息丢弃）次数。
pub fn record_decode_failure() {
    metrics().decode_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录按 key 覆盖写入次数。
pub fn record_store_upsert() {
    metrics().store_upserts.fetch_add(1, Ordering::Relaxed);
}

/// 记录追加写入次数。
pub fn record_store_append() {
    metrics().store_appends.fetch_add(1, Ordering::Relaxed);
}

/// 记录过期淘汰条数。
pub fn record_evicted(count: u64) {
    if count == 0 {
        return;
    }
    metrics().evicted_events.fetch_add(count, Ordering::Relaxed);
}

/// 记录建连尝试次数。
pub fn record_connection_attempt() {
    metrics().connection_attempts.fetch_add(1, Ordering::Relaxed);
}

/// 记录建连失败次数。
pub fn record_connection_failure() {
    metrics().connection_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录会话结束次数（断开或出错）。
pub fn record_session_closed() {
    metrics().sessions_closed.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次快照查询及返回的 Feature 数。
pub fn record_snapshot_served(features: u64) {
    let metrics = metrics();
    metrics.snapshots_served.fetch_add(1, Ordering::Relaxed);
    metrics
        .snapshot_features_total
        .fetch_add(features, Ordering::Relaxed);
}
