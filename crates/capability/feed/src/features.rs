use api_contract::{Feature, FeatureProperties, StrikeProperties, VesselProperties};
use domain::{EventAttributes, PointEvent};

const UNKNOWN_VESSEL: &str = "Unknown";

/// 点事件 -> GeoJSON Feature。
pub fn to_feature(event: PointEvent) -> Feature {
    let PointEvent {
        entity_key,
        coordinates,
        observed_at_ms,
        attributes,
    } = event;
    let properties = match attributes {
        EventAttributes::Vessel(attrs) => FeatureProperties::Vessel(VesselProperties {
            name: attrs.name.unwrap_or_else(|| UNKNOWN_VESSEL.to_string()),
            mmsi: entity_key.unwrap_or_default(),
            sog: attrs.sog,
            cog: attrs.cog,
            heading: attrs.heading,
            ts: observed_at_ms,
        }),
        EventAttributes::Strike(attrs) => FeatureProperties::Strike(StrikeProperties {
            ts: observed_at_ms,
            amplitude: attrs.amplitude,
            station_count: attrs.station_count,
        }),
    };
    Feature::point(coordinates.lon, coordinates.lat, properties)
}
