use api_contract::{
    Feature, FeatureCollection, FeatureProperties, FeedHealthDto, SnapshotQueryParams,
    StrikeProperties, VesselProperties,
};
use serde_json::{Value, json};

#[test]
fn empty_collection_shape() {
    let value = serde_json::to_value(FeatureCollection::empty()).expect("serialize");
    assert_eq!(value, json!({ "type": "FeatureCollection", "features": [] }));
}

#[test]
fn vessel_feature_shape() {
    let feature = Feature::point(
        0.2,
        39.0,
        FeatureProperties::Vessel(VesselProperties {
            name: "Unknown".to_string(),
            mmsi: "224000001".to_string(),
            sog: 12.5,
            cog: 90.0,
            heading: None,
            ts: 1_000,
        }),
    );
    let value = serde_json::to_value(FeatureCollection::new(vec![feature])).expect("serialize");
    let feature = &value["features"][0];
    assert_eq!(feature["type"], "Feature");
    assert_eq!(feature["geometry"]["type"], "Point");
    assert_eq!(feature["geometry"]["coordinates"], json!([0.2, 39.0]));
    assert_eq!(feature["properties"]["mmsi"], "224000001");
    assert_eq!(feature["properties"]["heading"], Value::Null);
    assert!(feature["properties"].get("amplitude").is_none());
}

#[test]
fn strike_properties_are_flat() {
    let feature = Feature::point(
        -0.03,
        39.98,
        FeatureProperties::Strike(StrikeProperties {
            ts: 5,
            amplitude: 12.0,
            station_count: 7,
        }),
    );
    let value = serde_json::to_value(feature).expect("serialize");
    assert_eq!(value["properties"], json!({ "ts": 5, "amplitude": 12.0, "station_count": 7 }));
}

#[test]
fn feed_health_is_camel_case() {
    let dto = FeedHealthDto {
        feed: "ships".to_string(),
        enabled: true,
        state: "streaming".to_string(),
        count: 3,
        last_error: None,
        streaming_since_ms: Some(10),
    };
    let value = serde_json::to_value(dto).expect("serialize");
    assert!(value.get("lastError").is_some());
    assert!(value.get("streamingSinceMs").is_some());
    assert!(value.get("last_error").is_none());
}

#[test]
fn snapshot_query_params_are_optional() {
    let params: SnapshotQueryParams = serde_json::from_str("{}").expect("parse");
    assert!(params.ttl_seconds.is_none());
    assert!(params.max_points.is_none());
    assert!(params.bbox.is_none());
}
