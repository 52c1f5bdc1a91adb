//! 实时数据源接入：长连接、消息解码、连接监管。

use async_trait::async_trait;
use domain::{Clock, PointEvent};
use pantalla_storage::IngestionStore;
use pantalla_telemetry::{record_decode_failure, record_decoded_event, record_raw_message};
use tracing::{debug, warn};

pub mod decode;
pub mod mqtt;
pub mod supervisor;
pub mod websocket;

pub use decode::{AisDecoder, LightningDecoder};
pub use mqtt::{MqttSource, MqttSourceConfig};
pub use supervisor::{Backoff, ConnectionSupervisor, SupervisorStatus};
pub use websocket::{WebSocketSource, WebSocketSourceConfig, install_crypto_provider};

/// 采集错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 握手或传输失败（可恢复，由监管器退避重连）。
    #[error("connection error: {0}")]
    Connection(String),
}

/// 上游消息解码错误：消息被丢弃，接收循环继续。
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("unsupported message: {0}")]
    UnsupportedMessage(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {0}: {1}")]
    InvalidField(&'static str, String),
    #[error("invalid coordinates: lon={lon} lat={lat}")]
    InvalidCoordinates { lon: f64, lat: f64 },
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::InvalidJson(err.to_string())
    }
}

/// 单条上游消息 -> 点事件。
pub trait Decoder: Send + Sync {
    /// `received_at_ms` 为入库时间，解码器据此给事件打时间戳。
    fn decode(&self, raw: &[u8], received_at_ms: i64) -> Result<PointEvent, DecodeError>;
}

/// 已建立的上游连接（订阅握手已完成）。
#[async_trait]
pub trait Connection: Send {
    /// 等待下一条业务消息；`Ok(None)` 表示对端正常关闭。
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, IngestError>;

    /// 主动关闭连接（停机时调用）。
    async fn close(&mut self) {}
}

/// 采集源抽象：负责建连与订阅握手。
#[async_trait]
pub trait EventSource: Send + Sync {
    /// 用于日志的端点描述。
    fn endpoint(&self) -> String;

    async fn connect(&self) -> Result<Box<dyn Connection>, IngestError>;
}

/// 解码一条原始消息并写入存储（每条消息至多一次写入）。
///
/// 解码失败只记录并返回错误，不影响连接。
pub fn ingest_message(
    decoder: &dyn Decoder,
    store: &IngestionStore,
    clock: &dyn Clock,
    raw: &[u8],
) -> Result<(), DecodeError> {
    record_raw_message();
    match decoder.decode(raw, clock.now_ms()) {
        Ok(event) => {
            record_decoded_event();
            store.write(event);
            Ok(())
        }
        Err(err) => {
            record_decode_failure();
            match &err {
                DecodeError::UnsupportedMessage(_) => {
                    debug!(target: "pantalla.ingest", error = %err, "message_skipped")
                }
                _ => warn!(
                    target: "pantalla.ingest",
                    error = %err,
                    payload_size = raw.len(),
                    "message_decode_failed"
                ),
            }
            Err(err)
        }
    }
}
