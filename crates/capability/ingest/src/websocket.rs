//! WebSocket 采集源（船舶 AIS）。

use crate::{Connection, EventSource, IngestError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Once;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::info;

/// 安装进程级 TLS 加密后端（ring）。
///
/// rustls 没有可用后端时 wss:// 握手会直接 panic；可重复调用。
pub fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        // 已有其他后端时保留原设置
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// WebSocket 采集源配置。
#[derive(Debug, Clone)]
pub struct WebSocketSourceConfig {
    pub url: String,
    /// 以 `Authorization: Bearer` 头携带的令牌。
    pub token: Option<String>,
    /// 握手成功后立即发送的订阅报文。
    pub subscription: String,
    pub connect_timeout: Duration,
}

/// WebSocket 采集源。
#[derive(Debug, Clone)]
pub struct WebSocketSource {
    config: WebSocketSourceConfig,
}

impl WebSocketSource {
    pub fn new(config: WebSocketSourceConfig) -> Self {
        install_crypto_provider();
        Self { config }
    }
}

#[async_trait]
impl EventSource for WebSocketSource {
    fn endpoint(&self) -> String {
        self.config.url.clone()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>, IngestError> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|err| IngestError::Connection(err.to_string()))?;
        if let Some(token) = self.config.token.as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|err| IngestError::Connection(err.to_string()))?;
            request.headers_mut().insert("Authorization", value);
        }

        let handshake = connect_async(request);
        let (mut stream, _) = tokio::time::timeout(self.config.connect_timeout, handshake)
            .await
            .map_err(|_| IngestError::Connection("websocket handshake timed out".to_string()))?
            .map_err(|err| IngestError::Connection(err.to_string()))?;

        stream
            .send(Message::Text(self.config.subscription.clone().into()))
            .await
            .map_err(|err| IngestError::Connection(err.to_string()))?;
        info!(
            target: "pantalla.ingest",
            url = %self.config.url,
            subscription_size = self.config.subscription.len(),
            "websocket_subscribed"
        );

        Ok(Box::new(WebSocketConnection { stream }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, IngestError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().as_bytes().to_vec())),
                Some(Ok(Message::Binary(bin))) => return Ok(Some(bin.to_vec())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Ping 的 Pong 回复由 tungstenite 在读取时自动排队发送
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(IngestError::Connection(err.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
