use api_contract::SnapshotQueryParams;
use async_trait::async_trait;
use domain::{
    BoundingBox, ConnectionState, Coordinates, EventAttributes, FeedKind, ManualClock, PointEvent,
    SpatialFilter, StrikeAttributes, VesselAttributes,
};
use pantalla_feed::{Feed, FeedError, FeedParts, FeedQuery};
use pantalla_ingest::{AisDecoder, Backoff, Connection, EventSource, IngestError, LightningDecoder};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const T0: i64 = 1_700_000_000_000;

/// 建连永远挂起的采集源，只统计建连次数。
#[derive(Default)]
struct PendingSource {
    connects: AtomicUsize,
}

#[async_trait]
impl EventSource for PendingSource {
    fn endpoint(&self) -> String {
        "pending://test".to_string()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>, IngestError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

fn ships_feed(source: Arc<PendingSource>, clock: Arc<ManualClock>, enabled: bool) -> Feed {
    Feed::new(FeedParts {
        kind: FeedKind::Ships,
        source,
        decoder: Arc::new(AisDecoder),
        defaults: FeedQuery {
            enabled,
            ttl_seconds: 120,
            max_points: 10,
            filter: Some(SpatialFilter::BoundingBox(
                BoundingBox::new(-1.0, 38.0, 1.5, 41.0).unwrap(),
            )),
        },
        retention_ms: 120_000,
        backoff: Backoff::new(Duration::from_millis(10), Duration::from_millis(40)),
        clock,
    })
}

fn storms_feed(source: Arc<PendingSource>, clock: Arc<ManualClock>) -> Feed {
    Feed::new(FeedParts {
        kind: FeedKind::Storms,
        source,
        decoder: Arc::new(LightningDecoder),
        defaults: FeedQuery {
            enabled: true,
            ttl_seconds: 600,
            max_points: 100,
            filter: Some(SpatialFilter::Radius {
                center: Coordinates::new(-0.37, 39.47).unwrap(),
                radius_km: 80.0,
            }),
        },
        retention_ms: 600_000,
        backoff: Backoff::default(),
        clock,
    })
}

fn vessel(mmsi: &str, lon: f64, lat: f64, ts: i64, name: Option<&str>) -> PointEvent {
    PointEvent::keyed(
        mmsi,
        Coordinates::new(lon, lat).unwrap(),
        ts,
        EventAttributes::Vessel(VesselAttributes {
            name: name.map(str::to_string),
            sog: 12.5,
            cog: 90.0,
            heading: None,
        }),
    )
}

fn strike(lon: f64, lat: f64, ts: i64) -> PointEvent {
    PointEvent::keyless(
        Coordinates::new(lon, lat).unwrap(),
        ts,
        EventAttributes::Strike(StrikeAttributes {
            amplitude: -12.0,
            station_count: 7,
        }),
    )
}

#[tokio::test]
async fn disabled_feed_returns_empty_without_connecting() {
    let source = Arc::new(PendingSource::default());
    let clock = Arc::new(ManualClock::new(T0));
    let feed = ships_feed(source.clone(), clock, false);
    feed.store().write(vessel("1", 0.0, 39.0, T0, None));

    let collection = feed.get_snapshot(feed.defaults()).unwrap();

    assert!(collection.is_empty());
    assert_eq!(feed.supervisor().state(), ConnectionState::Idle);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(source.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn snapshot_starts_ingestion_without_waiting() {
    let source = Arc::new(PendingSource::default());
    let clock = Arc::new(ManualClock::new(T0));
    let feed = ships_feed(source.clone(), clock, true);

    let collection = feed.get_snapshot(feed.defaults()).unwrap();
    assert!(collection.is_empty());
    assert!(feed.supervisor().state().is_active());

    feed.get_snapshot(feed.defaults()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(source.connects.load(Ordering::SeqCst), 1);

    feed.shutdown().await;
    assert_eq!(feed.supervisor().state(), ConnectionState::Idle);
}

#[tokio::test]
async fn moving_vessel_yields_single_latest_feature() {
    let clock = Arc::new(ManualClock::new(T0));
    let feed = ships_feed(Arc::new(PendingSource::default()), clock.clone(), true);
    feed.store().write(vessel("224000001", 0.0, 39.0, T0, Some("ALBA")));
    feed.store().write(vessel("224000001", 0.1, 39.0, T0 + 1_000, Some("ALBA")));
    feed.store().write(vessel("224000001", 0.2, 39.0, T0 + 2_000, Some("ALBA")));
    clock.set_ms(T0 + 3_000);

    let collection = feed.get_snapshot(feed.defaults()).unwrap();

    assert_eq!(collection.len(), 1);
    let body = serde_json::to_value(&collection).unwrap();
    assert_eq!(body["type"], "FeatureCollection");
    let feature = &body["features"][0];
    assert_eq!(feature["geometry"]["coordinates"], serde_json::json!([0.2, 39.0]));
    assert_eq!(feature["properties"]["mmsi"], "224000001");
    assert_eq!(feature["properties"]["name"], "ALBA");
    assert_eq!(feature["properties"]["ts"], T0 + 2_000);
    assert_eq!(feature["properties"]["heading"], Value::Null);
    feed.shutdown().await;
}

#[tokio::test]
async fn unnamed_vessel_is_reported_as_unknown() {
    let clock = Arc::new(ManualClock::new(T0));
    let feed = ships_feed(Arc::new(PendingSource::default()), clock, true);
    feed.store().write(vessel("7", 0.5, 39.5, T0, None));

    let body = serde_json::to_value(feed.get_snapshot(feed.defaults()).unwrap()).unwrap();

    assert_eq!(body["features"][0]["properties"]["name"], "Unknown");
    feed.shutdown().await;
}

#[tokio::test]
async fn stale_and_out_of_bounds_vessels_are_excluded() {
    let clock = Arc::new(ManualClock::new(T0));
    let feed = ships_feed(Arc::new(PendingSource::default()), clock.clone(), true);
    feed.store().write(vessel("1", 0.0, 39.0, T0, None));
    feed.store().write(vessel("2", 10.0, 50.0, T0 + 100_000, None));
    feed.store().write(vessel("3", 0.3, 39.3, T0 + 100_000, None));
    clock.set_ms(T0 + 121_000);

    let body = serde_json::to_value(feed.get_snapshot(feed.defaults()).unwrap()).unwrap();

    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["mmsi"], "3");
    feed.shutdown().await;
}

#[tokio::test]
async fn query_overrides_replace_defaults() {
    let clock = Arc::new(ManualClock::new(T0));
    let feed = ships_feed(Arc::new(PendingSource::default()), clock.clone(), true);
    for index in 0..5 {
        feed.store()
            .write(vessel(&index.to_string(), 0.1 * index as f64, 39.0, T0, None));
    }
    clock.set_ms(T0 + 1_000);

    let capped = feed
        .snapshot_with(&SnapshotQueryParams {
            max_points: Some(2),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(capped.len(), 2);

    let narrowed = feed
        .snapshot_with(&SnapshotQueryParams {
            bbox: Some("0.15,38.5,0.45,39.5".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(narrowed.len(), 2);

    let boundary = SnapshotQueryParams {
        ttl_seconds: Some(1),
        ..Default::default()
    };
    assert_eq!(feed.snapshot_with(&boundary).unwrap().len(), 5);
    clock.set_ms(T0 + 1_001);
    assert!(feed.snapshot_with(&boundary).unwrap().is_empty());
    feed.shutdown().await;
}

#[tokio::test]
async fn max_points_override_cannot_exceed_configured_cap() {
    let clock = Arc::new(ManualClock::new(T0));
    let feed = ships_feed(Arc::new(PendingSource::default()), clock.clone(), true);
    for index in 0..15 {
        feed.store()
            .write(vessel(&index.to_string(), 0.05 * index as f64, 39.0, T0, None));
    }
    clock.set_ms(T0 + 1_000);

    let collection = feed
        .snapshot_with(&SnapshotQueryParams {
            max_points: Some(1_000),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(collection.len(), feed.defaults().max_points);
    feed.shutdown().await;
}

#[tokio::test]
async fn invalid_query_is_rejected() {
    let feed = ships_feed(
        Arc::new(PendingSource::default()),
        Arc::new(ManualClock::new(T0)),
        true,
    );

    for params in [
        SnapshotQueryParams {
            ttl_seconds: Some(0),
            ..Default::default()
        },
        SnapshotQueryParams {
            max_points: Some(0),
            ..Default::default()
        },
        SnapshotQueryParams {
            bbox: Some("1,2,3".to_string()),
            ..Default::default()
        },
        SnapshotQueryParams {
            bbox: Some("2,40,1,39".to_string()),
            ..Default::default()
        },
    ] {
        let err = feed.snapshot_with(&params).unwrap_err();
        assert!(matches!(err, FeedError::InvalidQuery(_)));
    }
    assert_eq!(feed.supervisor().state(), ConnectionState::Idle);
}

#[tokio::test]
async fn storm_feed_applies_radius_and_retention() {
    let clock = Arc::new(ManualClock::new(T0));
    let feed = storms_feed(Arc::new(PendingSource::default()), clock.clone());
    for _ in 0..5 {
        feed.store().write(strike(-0.40, 39.50, T0));
    }
    clock.advance_ms(601_000);
    feed.store().write(strike(-0.30, 39.40, T0 + 601_000));
    feed.store().write(strike(2.0, 41.0, T0 + 601_000));

    let body = serde_json::to_value(feed.get_snapshot(feed.defaults()).unwrap()).unwrap();

    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["geometry"]["coordinates"], serde_json::json!([-0.3, 39.4]));
    assert_eq!(features[0]["properties"]["station_count"], 7);
    assert_eq!(features[0]["properties"]["ts"], T0 + 601_000);
    feed.shutdown().await;
}

#[tokio::test]
async fn health_reports_state_and_count() {
    let clock = Arc::new(ManualClock::new(T0));
    let feed = ships_feed(Arc::new(PendingSource::default()), clock, true);
    feed.store().write(vessel("1", 0.0, 39.0, T0, None));

    let idle = feed.health();
    assert_eq!(idle.feed, "ships");
    assert_eq!(idle.state, "idle");
    assert_eq!(idle.count, 1);

    feed.get_snapshot(feed.defaults()).unwrap();
    assert_eq!(feed.health().state, "connecting");
    feed.shutdown().await;
}
