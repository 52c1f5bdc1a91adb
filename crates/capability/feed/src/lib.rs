//! 数据源实例与快照查询。
//!
//! 每个数据源是一个显式持有的 [`Feed`]：存储、连接监管器与时钟绑定在一起，
//! 随进程启动创建、随停机关闭，通过请求上下文传递给 HTTP 层。

pub mod features;
pub mod query;

pub use query::{FeedError, FeedQuery};

use api_contract::{FeatureCollection, FeedHealthDto, SnapshotQueryParams};
use domain::{Clock, FeedKind};
use pantalla_ingest::{Backoff, ConnectionSupervisor, Decoder, EventSource};
use pantalla_storage::IngestionStore;
use pantalla_telemetry::record_snapshot_served;
use std::sync::Arc;
use tracing::debug;

/// 单个实时数据源。
pub struct Feed {
    kind: FeedKind,
    defaults: FeedQuery,
    store: Arc<IngestionStore>,
    supervisor: ConnectionSupervisor,
    clock: Arc<dyn Clock>,
}

/// 组装 [`Feed`] 所需的部件。
pub struct FeedParts {
    pub kind: FeedKind,
    pub source: Arc<dyn EventSource>,
    pub decoder: Arc<dyn Decoder>,
    pub defaults: FeedQuery,
    /// 追加型事件的保留时长（毫秒）。
    pub retention_ms: i64,
    pub backoff: Backoff,
    pub clock: Arc<dyn Clock>,
}

impl Feed {
    pub fn new(parts: FeedParts) -> Self {
        let store = Arc::new(IngestionStore::with_clock(
            parts.retention_ms,
            parts.clock.clone(),
        ));
        let supervisor = ConnectionSupervisor::new(
            parts.kind,
            parts.source,
            parts.decoder,
            store.clone(),
            parts.clock.clone(),
            parts.backoff,
        );
        Self {
            kind: parts.kind,
            defaults: parts.defaults,
            store,
            supervisor,
            clock: parts.clock,
        }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    pub fn defaults(&self) -> &FeedQuery {
        &self.defaults
    }

    pub fn store(&self) -> &Arc<IngestionStore> {
        &self.store
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    /// 快照查询：关闭时直接返回空集合；开启时先确保采集已启动（不等待），
    /// 再从存储中读取当前窗口。从不等待网络 I/O。
    pub fn get_snapshot(&self, query: &FeedQuery) -> Result<FeatureCollection, FeedError> {
        if !query.enabled {
            return Ok(FeatureCollection::empty());
        }
        query.validate()?;

        self.supervisor.start();
        let events = self.store.snapshot(
            self.clock.now_ms(),
            query.ttl_ms(),
            query.filter.as_ref(),
            query.max_points,
        );
        let collection = FeatureCollection::new(
            events.into_iter().map(features::to_feature).collect(),
        );
        record_snapshot_served(collection.len() as u64);
        debug!(
            target: "pantalla.feed",
            feed = %self.kind,
            count = collection.len(),
            state = self.supervisor.state().as_str(),
            "snapshot_served"
        );
        Ok(collection)
    }

    /// 以配置默认值为基础，叠加请求参数后查询。
    pub fn snapshot_with(
        &self,
        params: &SnapshotQueryParams,
    ) -> Result<FeatureCollection, FeedError> {
        if !self.defaults.enabled {
            return Ok(FeatureCollection::empty());
        }
        let query = self.defaults.with_overrides(params)?;
        self.get_snapshot(&query)
    }

    pub fn health(&self) -> FeedHealthDto {
        let status = self.supervisor.status();
        FeedHealthDto {
            feed: self.kind.as_str().to_string(),
            enabled: self.defaults.enabled,
            state: status.state.as_str().to_string(),
            count: self.store.len(),
            last_error: status.last_error,
            streaming_since_ms: status.streaming_since_ms,
        }
    }

    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
    }
}
