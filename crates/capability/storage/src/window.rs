use domain::{Clock, PointEvent, SpatialFilter, SystemClock};
use pantalla_telemetry::{record_evicted, record_store_append, record_store_upsert};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Default)]
struct WindowState {
    keyed: HashMap<String, PointEvent>,
    keyless: VecDeque<PointEvent>,
}

/// 存储占用统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub keyed: usize,
    pub keyless: usize,
}

impl StoreStats {
    pub fn total(&self) -> usize {
        self.keyed + self.keyless
    }
}

/// 实时事件窗口存储。
pub struct IngestionStore {
    state: RwLock<WindowState>,
    retention_ms: i64,
    clock: Arc<dyn Clock>,
}

impl IngestionStore {
    /// 创建存储，`retention_ms` 为追加型事件的保留时长。
    pub fn new(retention_ms: i64) -> Self {
        Self::with_clock(retention_ms, Arc::new(SystemClock))
    }

    pub fn with_clock(retention_ms: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(WindowState::default()),
            retention_ms: retention_ms.max(0),
            clock,
        }
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention_ms
    }

    /// 按事件是否带 key 分派到 upsert / append。
    pub fn write(&self, event: PointEvent) {
        match event.entity_key.clone() {
            Some(key) => self.upsert(key, event),
            None => self.append(event),
        }
    }

    /// 覆盖 key 对应的旧事件（后到者胜）。
    pub fn upsert(&self, key: impl Into<String>, event: PointEvent) {
        let mut state = self.write_state();
        state.keyed.insert(key.into(), event);
        record_store_upsert();
    }

    /// 追加无 key 事件，并清理超出保留时长的旧事件。
    pub fn append(&self, event: PointEvent) {
        let now_ms = self.clock.now_ms();
        let mut state = self.write_state();
        state.keyless.push_back(event);
        let before = state.keyless.len();
        let retention_ms = self.retention_ms;
        state
            .keyless
            .retain(|event| event.age_ms(now_ms) <= retention_ms);
        let evicted = before - state.keyless.len();
        drop(state);

        record_store_append();
        if evicted > 0 {
            record_evicted(evicted as u64);
            debug!(target: "pantalla.storage", evicted, "keyless_events_evicted");
        }
    }

    /// 时间点快照。
    ///
    /// 返回 `now_ms - observed_at_ms <= ttl_ms` 且满足空间过滤的事件，最多 `max_count` 条。
    /// 按存储自身的遍历顺序扫描（先 key 表后追加队列），达到上限即停止，
    /// 不保证排序；并发写入下被截断掉的是哪些事件不确定。
    pub fn snapshot(
        &self,
        now_ms: i64,
        ttl_ms: i64,
        filter: Option<&SpatialFilter>,
        max_count: usize,
    ) -> Vec<PointEvent> {
        if max_count == 0 {
            return Vec::new();
        }
        let state = self.read_state();
        let fresh = |event: &&PointEvent| event.age_ms(now_ms) <= ttl_ms;
        let inside = |event: &&PointEvent| {
            filter
                .map(|filter| filter.matches(&event.coordinates))
                .unwrap_or(true)
        };
        state
            .keyed
            .values()
            .chain(state.keyless.iter())
            .filter(fresh)
            .filter(inside)
            .take(max_count)
            .cloned()
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<PointEvent> {
        self.read_state().keyed.get(key).cloned()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.read_state();
        StoreStats {
            keyed: state.keyed.len(),
            keyless: state.keyless.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.stats().total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // 持锁期间不会 panic，中毒时直接沿用内部数据。
    fn read_state(&self) -> RwLockReadGuard<'_, WindowState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, WindowState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
