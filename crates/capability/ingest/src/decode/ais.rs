//! AIS Stream 位置报告解码。
//!
//! 报文形如：
//!
//! ```json
//! {
//!   "MessageType": "PositionReport",
//!   "MetaData": { "MMSI": 224000001, "ShipName": "ALBORAN   " },
//!   "Message": { "PositionReport": { "UserID": 224000001, "Latitude": 39.0,
//!                "Longitude": 0.2, "Sog": 12.3, "Cog": 90.1, "TrueHeading": 88 } }
//! }
//! ```

use crate::{DecodeError, Decoder};
use domain::{BoundingBox, Coordinates, EventAttributes, PointEvent, VesselAttributes};
use serde::{Deserialize, Serialize};

/// AIS 中 TrueHeading 的“不可用”取值。
const HEADING_UNAVAILABLE: f64 = 511.0;

const POSITION_MESSAGE_TYPES: [&str; 2] = ["PositionReport", "StandardClassBPositionReport"];

#[derive(Debug, Deserialize)]
struct AisEnvelope {
    #[serde(rename = "MessageType")]
    message_type: Option<String>,
    #[serde(rename = "MetaData")]
    meta: Option<AisMetaData>,
    #[serde(rename = "Message")]
    message: Option<AisMessage>,
}

#[derive(Debug, Deserialize)]
struct AisMetaData {
    #[serde(rename = "MMSI")]
    mmsi: Option<u64>,
    #[serde(rename = "ShipName", alias = "VesselName")]
    ship_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AisMessage {
    #[serde(rename = "PositionReport")]
    position_report: Option<PositionReport>,
    #[serde(rename = "StandardClassBPositionReport")]
    class_b_position_report: Option<PositionReport>,
}

#[derive(Debug, Deserialize)]
struct PositionReport {
    #[serde(rename = "UserID")]
    user_id: Option<u64>,
    #[serde(rename = "Latitude")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    longitude: Option<f64>,
    #[serde(rename = "Sog")]
    sog: Option<f64>,
    #[serde(rename = "Cog")]
    cog: Option<f64>,
    #[serde(rename = "TrueHeading")]
    true_heading: Option<f64>,
    #[serde(rename = "VesselName")]
    vessel_name: Option<String>,
}

/// AIS 解码器：按 MMSI 生成带 key 的船舶事件，时间戳取入库时间。
#[derive(Debug, Default, Clone, Copy)]
pub struct AisDecoder;

impl Decoder for AisDecoder {
    fn decode(&self, raw: &[u8], received_at_ms: i64) -> Result<PointEvent, DecodeError> {
        let envelope: AisEnvelope = serde_json::from_slice(raw)?;
        if let Some(message_type) = envelope.message_type.as_deref() {
            if !POSITION_MESSAGE_TYPES.contains(&message_type) {
                return Err(DecodeError::UnsupportedMessage(message_type.to_string()));
            }
        }
        let report = envelope
            .message
            .and_then(|message| message.position_report.or(message.class_b_position_report))
            .ok_or_else(|| DecodeError::UnsupportedMessage("no position report".to_string()))?;

        let mmsi = report
            .user_id
            .or_else(|| envelope.meta.as_ref().and_then(|meta| meta.mmsi))
            .filter(|mmsi| *mmsi > 0)
            .ok_or(DecodeError::MissingField("UserID"))?;
        let lon = report.longitude.ok_or(DecodeError::MissingField("Longitude"))?;
        let lat = report.latitude.ok_or(DecodeError::MissingField("Latitude"))?;
        let coordinates =
            Coordinates::new(lon, lat).ok_or(DecodeError::InvalidCoordinates { lon, lat })?;

        let name = envelope
            .meta
            .and_then(|meta| meta.ship_name)
            .or(report.vessel_name)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        let heading = report
            .true_heading
            .filter(|heading| *heading != HEADING_UNAVAILABLE && (0.0..360.0).contains(heading));

        Ok(PointEvent::keyed(
            mmsi.to_string(),
            coordinates,
            received_at_ms,
            EventAttributes::Vessel(VesselAttributes {
                name,
                sog: report.sog.unwrap_or(0.0),
                cog: report.cog.unwrap_or(0.0),
                heading,
            }),
        ))
    }
}

#[derive(Debug, Serialize)]
struct AisSubscription<'a> {
    #[serde(rename = "APIKey", skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
    /// `[[[lat_min, lon_min], [lat_max, lon_max]]]`
    #[serde(rename = "BoundingBoxes")]
    bounding_boxes: Vec<[[f64; 2]; 2]>,
    #[serde(rename = "FilterMessageTypes")]
    filter_message_types: &'a [String],
}

/// 构造建连后发送的订阅报文。
pub fn subscription_payload(
    token: Option<&str>,
    bbox: &BoundingBox,
    message_types: &[String],
) -> Result<String, serde_json::Error> {
    let subscription = AisSubscription {
        api_key: token,
        bounding_boxes: vec![[[bbox.lat_min, bbox.lon_min], [bbox.lat_max, bbox.lon_max]]],
        filter_message_types: message_types,
    };
    serde_json::to_string(&subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn position(mmsi: u64, lon: f64, lat: f64) -> Vec<u8> {
        json!({
            "MessageType": "PositionReport",
            "MetaData": { "MMSI": mmsi, "ShipName": "ALBORAN   " },
            "Message": { "PositionReport": {
                "UserID": mmsi, "Latitude": lat, "Longitude": lon,
                "Sog": 12.5, "Cog": 90.0, "TrueHeading": 511
            } }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn decodes_position_report() {
        let event = AisDecoder.decode(&position(224000001, 0.2, 39.0), 1_000).expect("decode");
        assert_eq!(event.entity_key.as_deref(), Some("224000001"));
        assert_eq!(event.coordinates, Coordinates { lon: 0.2, lat: 39.0 });
        assert_eq!(event.observed_at_ms, 1_000);
        let EventAttributes::Vessel(attrs) = event.attributes else {
            panic!("vessel attributes expected");
        };
        assert_eq!(attrs.name.as_deref(), Some("ALBORAN"));
        assert_eq!(attrs.sog, 12.5);
        assert!(attrs.heading.is_none());
    }

    #[test]
    fn rejects_unavailable_position() {
        // AIS 用 181/91 表示位置不可用
        let err = AisDecoder
            .decode(&position(224000001, 181.0, 91.0), 1_000)
            .expect_err("out of range");
        assert!(matches!(err, DecodeError::InvalidCoordinates { .. }));
    }

    #[test]
    fn skips_other_message_types() {
        let raw = json!({ "MessageType": "ShipStaticData", "Message": {} }).to_string();
        let err = AisDecoder.decode(raw.as_bytes(), 1_000).expect_err("unsupported");
        assert!(matches!(err, DecodeError::UnsupportedMessage(_)));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(matches!(
            AisDecoder.decode(b"not json", 1_000),
            Err(DecodeError::InvalidJson(_))
        ));
        let raw = json!({
            "Message": { "PositionReport": { "Latitude": "39.0", "Longitude": 0.1, "UserID": 1 } }
        })
        .to_string();
        assert!(matches!(
            AisDecoder.decode(raw.as_bytes(), 1_000),
            Err(DecodeError::InvalidJson(_))
        ));
        let raw = json!({
            "Message": { "PositionReport": { "Latitude": 39.0, "Longitude": 0.1 } }
        })
        .to_string();
        assert!(matches!(
            AisDecoder.decode(raw.as_bytes(), 1_000),
            Err(DecodeError::MissingField("UserID"))
        ));
    }

    #[test]
    fn subscription_uses_lat_lon_corners() {
        let bbox = BoundingBox::new(-1.0, 38.0, 1.5, 41.0).expect("bbox");
        let payload = subscription_payload(
            Some("key-1"),
            &bbox,
            &["PositionReport".to_string()],
        )
        .expect("payload");
        let value: serde_json::Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(value["APIKey"], "key-1");
        assert_eq!(value["BoundingBoxes"], json!([[[38.0, -1.0], [41.0, 1.5]]]));
        assert_eq!(value["FilterMessageTypes"], json!(["PositionReport"]));

        let payload = subscription_payload(None, &bbox, &[]).expect("payload");
        assert!(!payload.contains("APIKey"));
    }
}
