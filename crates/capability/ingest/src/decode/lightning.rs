//! 雷击消息解码（Blitzortung 风格 JSON）。
//!
//! 例：`{"lat": 39.98, "lon": -0.03, "time": 1700000000000000000, "amplitude": 12.3, "sta": 7}`

use crate::{DecodeError, Decoder};
use domain::{Coordinates, EventAttributes, PointEvent, StrikeAttributes};
use serde::Deserialize;

/// 上游时间允许超前本机的最大偏差。
const MAX_FUTURE_SKEW_MS: i64 = 5_000;

#[derive(Debug, Deserialize)]
struct StrikePayload {
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
    #[serde(alias = "ts", alias = "timestamp")]
    time: Option<f64>,
    #[serde(alias = "amp")]
    amplitude: Option<f64>,
    #[serde(alias = "sta", alias = "stations")]
    station_count: Option<u32>,
    /// 参与定位的站点信号列表，无 station_count 时用其长度。
    sig: Option<Vec<serde_json::Value>>,
}

/// 雷击解码器：生成无 key 的追加型事件。
#[derive(Debug, Default, Clone, Copy)]
pub struct LightningDecoder;

impl Decoder for LightningDecoder {
    fn decode(&self, raw: &[u8], received_at_ms: i64) -> Result<PointEvent, DecodeError> {
        let payload: StrikePayload = serde_json::from_slice(raw)?;
        let lon = payload.lon.ok_or(DecodeError::MissingField("lon"))?;
        let lat = payload.lat.ok_or(DecodeError::MissingField("lat"))?;
        let coordinates =
            Coordinates::new(lon, lat).ok_or(DecodeError::InvalidCoordinates { lon, lat })?;

        let station_count = payload
            .station_count
            .or_else(|| payload.sig.as_ref().map(|sig| sig.len() as u32))
            .unwrap_or(0);
        let amplitude = payload.amplitude.unwrap_or(0.0);
        if !amplitude.is_finite() {
            return Err(DecodeError::InvalidField("amplitude", amplitude.to_string()));
        }

        Ok(PointEvent::keyless(
            coordinates,
            observed_at_ms(payload.time, received_at_ms),
            EventAttributes::Strike(StrikeAttributes {
                amplitude,
                station_count,
            }),
        ))
    }
}

/// 上游时间仅在不超前本机（允许少量偏差）时采用，否则取入库时间。
fn observed_at_ms(upstream: Option<f64>, received_at_ms: i64) -> i64 {
    let Some(upstream_ms) = upstream.and_then(epoch_to_ms) else {
        return received_at_ms;
    };
    if upstream_ms > received_at_ms.saturating_add(MAX_FUTURE_SKEW_MS) {
        return received_at_ms;
    }
    upstream_ms
}

/// 按数量级推断单位：秒 / 毫秒 / 微秒 / 纳秒。
fn epoch_to_ms(value: f64) -> Option<i64> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    let ms = if value >= 1e17 {
        value / 1e6
    } else if value >= 1e14 {
        value / 1e3
    } else if value >= 1e11 {
        value
    } else {
        value * 1e3
    };
    Some(ms.round() as i64)
}
