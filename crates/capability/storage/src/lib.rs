//! # Pantalla Storage 模块
//!
//! 实时数据源的内存窗口存储。
//!
//! - 带 key 的事件（船舶）：每个 key 只保留最新一条，新事件整体覆盖旧事件；
//!   不主动淘汰，过期只在查询时按 ttl 过滤，占用受实体数量约束。
//! - 无 key 的事件（雷击）：只追加，每次追加时顺带清理超出保留时长的事件。
//!
//! 写入方只有一个（数据源的接收循环），读取方可有任意多个（HTTP 快照查询）。
//! 所有操作只在单次调用期间持锁，不跨越任何 I/O 等待。

pub mod window;

pub use window::{IngestionStore, StoreStats};
