//! 数据源装配：采集源、解码器与查询默认值按配置组装成 [`Feed`]。

use domain::{FeedKind, SpatialFilter, SystemClock};
use pantalla_config::{ShipsConfig, StormConfig};
use pantalla_feed::{Feed, FeedParts, FeedQuery};
use pantalla_ingest::decode::subscription_payload;
use pantalla_ingest::{
    AisDecoder, Backoff, LightningDecoder, MqttSource, MqttSourceConfig, WebSocketSource,
    WebSocketSourceConfig,
};
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 船舶数据源：WebSocket + AIS 解码，按包围盒过滤。
pub fn ships_feed(config: &ShipsConfig, backoff: Backoff) -> Result<Feed, serde_json::Error> {
    let subscription = subscription_payload(
        config.token.as_deref(),
        &config.bbox,
        &config.message_types,
    )?;
    let source = WebSocketSource::new(WebSocketSourceConfig {
        url: config.ws_url.clone(),
        token: config.token.clone(),
        subscription,
        connect_timeout: CONNECT_TIMEOUT,
    });
    Ok(Feed::new(FeedParts {
        kind: FeedKind::Ships,
        source: Arc::new(source),
        decoder: Arc::new(AisDecoder),
        defaults: FeedQuery {
            enabled: config.enabled,
            ttl_seconds: config.ttl_seconds,
            max_points: config.max_points,
            filter: Some(SpatialFilter::BoundingBox(config.bbox)),
        },
        retention_ms: seconds_to_ms(config.ttl_seconds),
        backoff,
        clock: Arc::new(SystemClock),
    }))
}

/// 雷电数据源：MQTT + 雷击解码；配置了位置时按半径过滤。
pub fn storms_feed(config: &StormConfig, backoff: Backoff) -> Feed {
    let source = MqttSource::new(MqttSourceConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        client_id: config.mqtt_client_id.clone(),
        topic: config.topic.clone(),
        connect_timeout: CONNECT_TIMEOUT,
    });
    let filter = config.location.map(|center| SpatialFilter::Radius {
        center,
        radius_km: config.max_radius_km,
    });
    Feed::new(FeedParts {
        kind: FeedKind::Storms,
        source: Arc::new(source),
        decoder: Arc::new(LightningDecoder),
        defaults: FeedQuery {
            enabled: config.enabled,
            ttl_seconds: config.ttl_seconds,
            max_points: config.max_points,
            filter,
        },
        retention_ms: seconds_to_ms(config.retention_seconds),
        backoff,
        clock: Arc::new(SystemClock),
    })
}

fn seconds_to_ms(seconds: u64) -> i64 {
    i64::try_from(seconds)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000)
}
