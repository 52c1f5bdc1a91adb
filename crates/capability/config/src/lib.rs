//! 应用运行配置加载。

use domain::{BoundingBox, Coordinates};
use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub ships: ShipsConfig,
    pub storm: StormConfig,
    pub supervisor: SupervisorConfig,
}

/// 船舶（AIS）数据源配置。
#[derive(Debug, Clone)]
pub struct ShipsConfig {
    pub enabled: bool,
    pub ws_url: String,
    pub token: Option<String>,
    /// 查询过滤与上游订阅共用的包围盒。
    pub bbox: BoundingBox,
    pub ttl_seconds: u64,
    pub max_points: usize,
    pub message_types: Vec<String>,
}

/// 雷电（MQTT）数据源配置。
#[derive(Debug, Clone)]
pub struct StormConfig {
    pub enabled: bool,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_client_id: String,
    pub topic: String,
    pub ttl_seconds: u64,
    pub max_points: usize,
    pub max_radius_km: f64,
    /// 半径过滤圆心；未配置时不做空间过滤。
    pub location: Option<Coordinates>,
    /// 追加型事件的保留时长（与单次查询的 ttl 无关）。
    pub retention_seconds: u64,
}

/// 连接监管器参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl SupervisorConfig {
    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            min_backoff_ms: 5_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意 key -> value 查找函数读取配置。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reader = Reader { lookup };

        let http_addr = reader.string_or("PANTALLA_HTTP_ADDR", "0.0.0.0:8081");

        let ships = ShipsConfig {
            enabled: reader.bool_or("PANTALLA_SHIPS_ENABLED", true)?,
            ws_url: reader.string_or(
                "PANTALLA_SHIPS_WS_URL",
                "wss://stream.aisstream.io/v0/stream",
            ),
            token: reader.optional("PANTALLA_SHIPS_TOKEN"),
            bbox: reader.bbox_or("PANTALLA_SHIPS_BBOX", "-1.0,38.0,1.5,41.0")?,
            ttl_seconds: reader.positive_u64_or("PANTALLA_SHIPS_TTL_SECONDS", 120)?,
            max_points: reader.positive_usize_or("PANTALLA_SHIPS_MAX_POINTS", 2000)?,
            message_types: reader.list_or("PANTALLA_SHIPS_MESSAGE_TYPES", &["PositionReport"]),
        };

        let storm = StormConfig {
            enabled: reader.bool_or("PANTALLA_STORM_ENABLED", true)?,
            mqtt_host: reader.string_or("PANTALLA_STORM_MQTT_HOST", "127.0.0.1"),
            mqtt_port: reader.u16_or("PANTALLA_STORM_MQTT_PORT", 1883)?,
            mqtt_username: reader.optional("PANTALLA_STORM_MQTT_USERNAME"),
            mqtt_password: reader.optional("PANTALLA_STORM_MQTT_PASSWORD"),
            mqtt_client_id: reader
                .string_or("PANTALLA_STORM_MQTT_CLIENT_ID", "pantalla-reloj-storm"),
            topic: reader.string_or("PANTALLA_STORM_TOPIC", "blitzortung/lightning"),
            ttl_seconds: reader.positive_u64_or("PANTALLA_STORM_TTL_SECONDS", 600)?,
            max_points: reader.positive_usize_or("PANTALLA_STORM_MAX_POINTS", 3000)?,
            max_radius_km: reader.positive_f64_or("PANTALLA_STORM_MAX_RADIUS_KM", 80.0)?,
            location: reader.location("PANTALLA_STORM_LOCATION")?,
            retention_seconds: reader.positive_u64_or("PANTALLA_STORM_RETENTION_SECONDS", 600)?,
        };

        let supervisor = SupervisorConfig {
            min_backoff_ms: reader.positive_u64_or("PANTALLA_SUPERVISOR_MIN_BACKOFF_MS", 5_000)?,
            max_backoff_ms: reader.positive_u64_or("PANTALLA_SUPERVISOR_MAX_BACKOFF_MS", 60_000)?,
        };
        if supervisor.max_backoff_ms < supervisor.min_backoff_ms {
            return Err(ConfigError::Invalid(
                "PANTALLA_SUPERVISOR_MAX_BACKOFF_MS".to_string(),
                supervisor.max_backoff_ms.to_string(),
            ));
        }

        Ok(Self {
            http_addr,
            ships,
            storm,
            supervisor,
        })
    }
}

struct Reader<F> {
    lookup: F,
}

impl<F> Reader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// 空字符串视为未配置。
    fn optional(&self, key: &str) -> Option<String> {
        match (self.lookup)(key) {
            Some(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
            _ => None,
        }
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "0" | "false" | "off" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        }
    }

    fn u16_or(&self, key: &str, default: u16) -> Result<u16, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        value
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }

    fn positive_u64_or(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        match value.parse::<u64>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        }
    }

    fn positive_usize_or(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        match value.parse::<usize>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        }
    }

    fn positive_f64_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        match value.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() && parsed > 0.0 => Ok(parsed),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        }
    }

    fn list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        let items = self
            .optional(key)
            .map(|value| {
                value
                    .split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if items.is_empty() {
            return default.iter().map(|item| item.to_string()).collect();
        }
        items
    }

    fn bbox_or(&self, key: &str, default: &str) -> Result<BoundingBox, ConfigError> {
        let value = self.string_or(key, default);
        BoundingBox::parse(&value).map_err(|reason| ConfigError::Invalid(key.to_string(), reason))
    }

    /// `lat,lon`
    fn location(&self, key: &str) -> Result<Option<Coordinates>, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(None);
        };
        let parts = value
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value.clone()))?;
        match parts.as_slice() {
            [lat, lon] => Coordinates::new(*lon, *lat)
                .map(Some)
                .ok_or_else(|| ConfigError::Invalid(key.to_string(), value.clone())),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        }
    }
}
