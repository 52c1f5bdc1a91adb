//! MQTT 采集源（雷电数据）。

use crate::{Connection, EventSource, IngestError};
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::info;

/// MQTT 采集源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    pub topic: String,
    pub connect_timeout: Duration,
}

/// MQTT 采集源。
#[derive(Debug, Clone)]
pub struct MqttSource {
    config: MqttSourceConfig,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EventSource for MqttSource {
    fn endpoint(&self) -> String {
        format!("mqtt://{}:{}/{}", self.config.host, self.config.port, self.config.topic)
    }

    async fn connect(&self) -> Result<Box<dyn Connection>, IngestError> {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_keep_alive(Duration::from_secs(60));
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        tokio::time::timeout(self.config.connect_timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| IngestError::Connection("mqtt connack timed out".to_string()))??;

        client
            .subscribe(self.config.topic.clone(), QoS::AtMostOnce)
            .await
            .map_err(|err| IngestError::Connection(err.to_string()))?;
        info!(
            target: "pantalla.ingest",
            host = %self.config.host,
            port = self.config.port,
            topic = %self.config.topic,
            "mqtt_subscribed"
        );

        Ok(Box::new(MqttConnection { client, eventloop }))
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), IngestError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    return Ok(());
                }
                return Err(IngestError::Connection(format!(
                    "mqtt connection refused: {:?}",
                    ack.code
                )));
            }
            Ok(_) => {}
            Err(err) => return Err(IngestError::Connection(err.to_string())),
        }
    }
}

struct MqttConnection {
    // 持有 client，否则请求通道关闭后 eventloop 会报错退出
    client: AsyncClient,
    eventloop: EventLoop,
}

#[async_trait]
impl Connection for MqttConnection {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, IngestError> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(Some(publish.payload.to_vec()));
                }
                Ok(Event::Incoming(Packet::Disconnect)) => return Ok(None),
                Ok(_) => {}
                Err(err) => return Err(IngestError::Connection(err.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        if self.client.try_disconnect().is_ok() {
            // 让 eventloop 把 DISCONNECT 发出去
            let _ = tokio::time::timeout(Duration::from_millis(500), self.eventloop.poll()).await;
        }
    }
}
