//! 连接监管器：保证每个数据源至多一个在途连接，并在失败后退避重连。
//!
//! 状态流转：
//!
//! ```text
//! Idle --start--> Connecting --握手成功--> Streaming
//! Connecting/Streaming --失败或断开--> Failed --退避结束--> Connecting
//! 任意状态 --shutdown--> Idle
//! ```
//!
//! `start` 只在 `Idle` 时生效，其余状态下为空操作；`Failed` 期间后台任务仍在，
//! 退避结束后由它自己重连。错误只体现在日志、指标与 [`SupervisorStatus`] 中，
//! 不会返回给查询方。

use crate::{Connection, Decoder, EventSource, IngestError, ingest_message};
use domain::{Clock, ConnectionState, FeedKind};
use pantalla_storage::IngestionStore;
use pantalla_telemetry::{
    record_connection_attempt, record_connection_failure, record_session_closed,
};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 重连退避参数：从 `min` 开始逐次翻倍，封顶 `max`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub min: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(60))
    }
}

/// 监管器状态快照（健康检查用）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorStatus {
    pub state: ConnectionState,
    pub last_error: Option<String>,
    pub streaming_since_ms: Option<i64>,
    pub connection_attempts: u64,
}

#[derive(Debug)]
struct StatusCell {
    state: ConnectionState,
    last_error: Option<String>,
    streaming_since_ms: Option<i64>,
}

struct SupervisorInner {
    feed: FeedKind,
    source: Arc<dyn EventSource>,
    decoder: Arc<dyn Decoder>,
    store: Arc<IngestionStore>,
    clock: Arc<dyn Clock>,
    backoff: Backoff,
    shutdown: CancellationToken,
    status: Mutex<StatusCell>,
    task: Mutex<Option<JoinHandle<()>>>,
    connection_attempts: AtomicU64,
}

enum SessionOutcome {
    Cancelled,
    Ended { streamed: bool, error: Option<String> },
}

/// 单个数据源的连接监管器。
#[derive(Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<SupervisorInner>,
}

impl ConnectionSupervisor {
    pub fn new(
        feed: FeedKind,
        source: Arc<dyn EventSource>,
        decoder: Arc<dyn Decoder>,
        store: Arc<IngestionStore>,
        clock: Arc<dyn Clock>,
        backoff: Backoff,
    ) -> Self {
        let inner = SupervisorInner {
            feed,
            source,
            decoder,
            store,
            clock,
            backoff,
            shutdown: CancellationToken::new(),
            status: Mutex::new(StatusCell {
                state: ConnectionState::Idle,
                last_error: None,
                streaming_since_ms: None,
            }),
            task: Mutex::new(None),
            connection_attempts: AtomicU64::new(0),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// 启动后台采集任务（幂等，不等待建连结果）。
    ///
    /// 返回是否真的启动了新任务。需在 Tokio 运行时内调用。
    pub fn start(&self) -> bool {
        if self.inner.shutdown.is_cancelled() {
            return false;
        }
        let mut status = lock(&self.inner.status);
        if status.state.is_active() {
            return false;
        }
        status.state = ConnectionState::Connecting;
        status.streaming_since_ms = None;

        let inner = self.inner.clone();
        let handle = tokio::spawn(supervise(inner));
        *lock(&self.inner.task) = Some(handle);
        drop(status);

        info!(
            target: "pantalla.supervisor",
            feed = %self.inner.feed,
            endpoint = %self.inner.source.endpoint(),
            "supervisor_started"
        );
        true
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.status).state
    }

    pub fn status(&self) -> SupervisorStatus {
        let status = lock(&self.inner.status);
        SupervisorStatus {
            state: status.state,
            last_error: status.last_error.clone(),
            streaming_since_ms: status.streaming_since_ms,
            connection_attempts: self.inner.connection_attempts.load(Ordering::Relaxed),
        }
    }

    /// 停机：打断接收循环、关闭连接并等待后台任务退出。之后 `start` 不再生效。
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let handle = lock(&self.inner.task).take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(
                    target: "pantalla.supervisor",
                    feed = %self.inner.feed,
                    error = %err,
                    "supervisor_task_join_failed"
                );
            }
        }
        self.inner.set_state(ConnectionState::Idle);
        info!(target: "pantalla.supervisor", feed = %self.inner.feed, "supervisor_stopped");
    }
}

impl SupervisorInner {
    fn set_state(&self, state: ConnectionState) {
        let mut status = lock(&self.status);
        status.state = state;
        if state != ConnectionState::Streaming {
            status.streaming_since_ms = None;
        }
    }

    fn mark_streaming(&self) {
        let mut status = lock(&self.status);
        status.state = ConnectionState::Streaming;
        status.streaming_since_ms = Some(self.clock.now_ms());
        status.last_error = None;
    }

    fn mark_failed(&self, error: Option<String>) {
        let mut status = lock(&self.status);
        status.state = ConnectionState::Failed;
        status.streaming_since_ms = None;
        if error.is_some() {
            status.last_error = error;
        }
    }

    async fn run_session(&self) -> SessionOutcome {
        self.set_state(ConnectionState::Connecting);
        self.connection_attempts.fetch_add(1, Ordering::Relaxed);
        record_connection_attempt();

        let connected = tokio::select! {
            _ = self.shutdown.cancelled() => return SessionOutcome::Cancelled,
            connected = self.source.connect() => connected,
        };
        let mut connection = match connected {
            Ok(connection) => connection,
            Err(err) => {
                return SessionOutcome::Ended {
                    streamed: false,
                    error: Some(err.to_string()),
                };
            }
        };

        self.mark_streaming();
        info!(
            target: "pantalla.supervisor",
            feed = %self.feed,
            endpoint = %self.source.endpoint(),
            "connection_streaming"
        );

        match self.receive_loop(connection.as_mut()).await {
            Ok(true) => {
                connection.close().await;
                SessionOutcome::Cancelled
            }
            Ok(false) => SessionOutcome::Ended {
                streamed: true,
                error: None,
            },
            Err(err) => SessionOutcome::Ended {
                streamed: true,
                error: Some(err.to_string()),
            },
        }
    }

    /// 按到达顺序逐条处理消息；返回 `Ok(true)` 表示被停机打断。
    async fn receive_loop(&self, connection: &mut dyn Connection) -> Result<bool, IngestError> {
        loop {
            let next = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(true),
                next = connection.next_message() => next,
            };
            match next? {
                Some(raw) => {
                    // 解码失败已记录，继续接收
                    let _ = ingest_message(
                        self.decoder.as_ref(),
                        &self.store,
                        self.clock.as_ref(),
                        &raw,
                    );
                }
                None => return Ok(false),
            }
        }
    }
}

async fn supervise(inner: Arc<SupervisorInner>) {
    let mut delay = inner.backoff.min;
    loop {
        // 会话内 panic 按一次失败处理，照常退避重连
        let outcome = AssertUnwindSafe(inner.run_session()).catch_unwind().await;
        let (streamed, error) = match outcome {
            Ok(SessionOutcome::Cancelled) => break,
            Ok(SessionOutcome::Ended { streamed, error }) => (streamed, error),
            Err(panic) => {
                let message = format!("session panicked: {}", panic_message(&*panic));
                (false, Some(message))
            }
        };

        if streamed {
            record_session_closed();
            delay = inner.backoff.min;
        } else {
            record_connection_failure();
        }
        warn!(
            target: "pantalla.supervisor",
            feed = %inner.feed,
            streamed,
            error = error.as_deref().unwrap_or("closed by peer"),
            retry_in_ms = delay.as_millis() as u64,
            "connection_lost"
        );
        inner.mark_failed(error);

        tokio::select! {
            _ = inner.shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = inner.backoff.next(delay);
    }
    inner.set_state(ConnectionState::Idle);
}

fn panic_message<'a>(panic: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::Backoff;
    use std::time::Duration;

    #[test]
    fn backoff_doubles_until_capped() {
        let backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60));
        let mut delay = backoff.min;
        let mut delays = Vec::new();
        for _ in 0..6 {
            delays.push(delay.as_secs());
            delay = backoff.next(delay);
        }
        assert_eq!(delays, vec![5, 10, 20, 40, 60, 60]);
    }

    #[test]
    fn backoff_max_never_below_min() {
        let backoff = Backoff::new(Duration::from_millis(500), Duration::from_millis(100));
        assert_eq!(backoff.max, Duration::from_millis(500));
        assert_eq!(backoff.next(backoff.min), Duration::from_millis(500));
    }

    #[test]
    fn default_backoff_is_five_to_sixty_seconds() {
        let backoff = Backoff::default();
        assert_eq!(backoff.min, Duration::from_secs(5));
        assert_eq!(backoff.max, Duration::from_secs(60));
    }
}
