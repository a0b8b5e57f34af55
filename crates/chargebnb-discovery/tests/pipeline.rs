//! End-to-end pipeline runs against mocked backend and script hosts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chargebnb_core::Coordinate;
use chargebnb_discovery::maps::HttpScriptLoader;
use chargebnb_discovery::{
    DiscoveryPipeline, LocationError, LocationProvider, MapLibrary, NoLocation, StageError,
    StationsClient, ViewScope,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Location provider that counts requests and answers with a fixed outcome.
#[derive(Clone)]
struct ScriptedLocation {
    outcome: Result<Coordinate, LocationError>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedLocation {
    fn granted(at: Coordinate) -> Self {
        Self {
            outcome: Ok(at),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn denied() -> Self {
        Self {
            outcome: Err(LocationError::Denied("User denied geolocation".to_string())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LocationProvider for ScriptedLocation {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

fn test_client(base_url: &str) -> StationsClient {
    StationsClient::with_base_url(base_url, 5, "chargebnb-test")
        .expect("client construction should not fail")
}

fn map_library(server: &MockServer) -> Arc<MapLibrary<HttpScriptLoader>> {
    let loader = HttpScriptLoader::new(5, "chargebnb-test").expect("loader should build");
    Arc::new(MapLibrary::new(
        loader,
        format!("{}/maps/api/js?key=test-key", server.uri()),
    ))
}

async fn mount_script(server: &MockServer, expected_loads: u64) {
    Mock::given(method("GET"))
        .and(path("/maps/api/js"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("/* maps */"))
        .expect(expected_loads)
        .mount(server)
        .await;
}

async fn mount_test_station(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/nearby_stations"))
        .and(query_param("lat", "1"))
        .and(query_param("lng", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "stations": [
                { "id": 1, "name": "Test Station", "lat": 1, "lng": 2, "address": "123 Main St" }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn location_denial_stops_before_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nearby_stations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_script(&server, 0).await;

    let scope = ViewScope::new();
    let mut pipeline = DiscoveryPipeline::new(
        ScriptedLocation::denied(),
        test_client(&server.uri()),
        map_library(&server),
        14,
    );

    let state = pipeline.run(&scope.token()).await;

    assert_eq!(state.errors.location, Some(StageError::LocationDenied));
    assert_eq!(state.errors.current(), Some(StageError::LocationDenied));
    assert!(state.stations.is_empty());
    assert!(state.coordinate.is_none());
    assert!(state.map.is_none());
    assert!(pipeline
        .view()
        .to_string()
        .contains("Unable to get your location."));
}

#[tokio::test]
async fn unsupported_location_is_reported() {
    let server = MockServer::start().await;
    mount_script(&server, 0).await;

    let scope = ViewScope::new();
    let mut pipeline = DiscoveryPipeline::new(
        NoLocation,
        test_client(&server.uri()),
        map_library(&server),
        14,
    );

    let state = pipeline.run(&scope.token()).await;

    assert_eq!(state.errors.location, Some(StageError::LocationUnsupported));
    assert!(pipeline
        .view()
        .to_string()
        .contains("Geolocation is not supported"));
}

#[tokio::test]
async fn located_user_sees_nearby_stations_on_map() {
    let server = MockServer::start().await;
    mount_test_station(&server).await;
    mount_script(&server, 1).await;

    let scope = ViewScope::new();
    let maps = map_library(&server);
    let mut pipeline = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client(&server.uri()),
        Arc::clone(&maps),
        14,
    );

    let state = pipeline.run(&scope.token()).await;

    assert!(state.errors.is_empty());
    assert_eq!(state.stations.len(), 1);
    assert_eq!(state.markers_placed, 1);
    let map = state.map.expect("map should be created");
    assert_eq!(map.center, Coordinate::new(1.0, 2.0));
    assert_eq!(map.zoom, 14);

    let markers = maps.loaded().expect("library loaded").markers(&map);
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].title, "Test Station");
    assert_eq!(markers[0].position, Coordinate::new(1.0, 2.0));

    let rendered = pipeline.view().to_string();
    assert!(rendered.contains("Test Station"));
    assert!(rendered.contains("123 Main St"));
}

#[tokio::test]
async fn backend_failure_still_loads_map() {
    let server = MockServer::start().await;
    mount_script(&server, 1).await;

    let scope = ViewScope::new();
    let mut pipeline = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client("http://127.0.0.1:1"),
        map_library(&server),
        14,
    );

    let state = pipeline.run(&scope.token()).await;

    assert_eq!(state.errors.query, Some(StageError::QueryFailed));
    assert!(state.stations.is_empty());
    assert!(state.map.is_some(), "map load must not depend on the query");
    assert_eq!(state.markers_placed, 0);
    assert!(pipeline
        .view()
        .to_string()
        .contains("Failed to fetch stations."));
}

#[tokio::test]
async fn server_error_is_query_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nearby_stations"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_script(&server, 1).await;

    let scope = ViewScope::new();
    let mut pipeline = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client(&server.uri()),
        map_library(&server),
        14,
    );

    let state = pipeline.run(&scope.token()).await;
    assert_eq!(state.errors.current(), Some(StageError::QueryFailed));
}

#[tokio::test]
async fn script_failure_is_map_unavailable_and_stations_still_listed() {
    let server = MockServer::start().await;
    mount_test_station(&server).await;
    Mock::given(method("GET"))
        .and(path("/maps/api/js"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let scope = ViewScope::new();
    let maps = map_library(&server);
    let mut pipeline = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client(&server.uri()),
        Arc::clone(&maps),
        14,
    );

    let state = pipeline.run(&scope.token()).await;

    assert_eq!(state.errors.map, Some(StageError::MapUnavailable));
    assert!(state.map.is_none());
    assert_eq!(state.markers_placed, 0);
    assert!(!maps.is_loaded());
    let rendered = pipeline.view().to_string();
    assert!(rendered.contains("Map library failed to load."));
    assert!(rendered.contains("Test Station"));
}

#[tokio::test]
async fn rerun_reuses_coordinate_and_library() {
    let server = MockServer::start().await;
    mount_test_station(&server).await;
    mount_script(&server, 1).await;

    let scope = ViewScope::new();
    let location = ScriptedLocation::granted(Coordinate::new(1.0, 2.0));
    let maps = map_library(&server);
    let mut pipeline = DiscoveryPipeline::new(
        location.clone(),
        test_client(&server.uri()),
        Arc::clone(&maps),
        14,
    );

    let token = scope.token();
    let first_map = pipeline.run(&token).await.map.expect("first map");
    let second_map = pipeline.run(&token).await.map.expect("second map");

    assert_eq!(location.calls(), 1, "location must be requested only once");
    assert_ne!(first_map.id, second_map.id, "map handle is rebuilt per run");

    let api = maps.loaded().expect("library loaded");
    assert_eq!(api.map_count(), 2);
    assert_eq!(api.markers(&second_map).len(), 1);
    assert_eq!(pipeline.state().markers_placed, 1);
}

#[tokio::test]
async fn concurrent_pipelines_load_library_once() {
    let server = MockServer::start().await;
    mount_test_station(&server).await;
    Mock::given(method("GET"))
        .and(path("/maps/api/js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("/* maps */")
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let maps = map_library(&server);
    let scope = ViewScope::new();
    let token = scope.token();
    let mut first = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client(&server.uri()),
        Arc::clone(&maps),
        14,
    );
    let mut second = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client(&server.uri()),
        Arc::clone(&maps),
        14,
    );

    let (a, b) = tokio::join!(first.run(&token), second.run(&token));

    assert!(a.map.is_some());
    assert!(b.map.is_some());
    assert_eq!(maps.loaded().expect("library loaded").map_count(), 2);
}

#[tokio::test]
async fn teardown_mid_flight_discards_late_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nearby_stations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "stations": [
                        { "id": 1, "name": "Test Station", "lat": 1, "lng": 2, "address": "123 Main St" }
                    ]
                }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps/api/js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("/* maps */")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let scope = ViewScope::new();
    let token = scope.token();
    let mut pipeline = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client(&server.uri()),
        map_library(&server),
        14,
    );

    let teardown = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        scope.teardown();
    };
    let (state, ()) = tokio::join!(pipeline.run(&token), teardown);

    assert_eq!(state.coordinate, Some(Coordinate::new(1.0, 2.0)));
    assert!(state.stations.is_empty());
    assert!(state.map.is_none());
    assert!(state.errors.is_empty());
}

#[tokio::test]
async fn torn_down_view_does_not_abort_shared_library_load() {
    let server = MockServer::start().await;
    mount_test_station(&server).await;
    Mock::given(method("GET"))
        .and(path("/maps/api/js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("/* maps */")
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let maps = map_library(&server);
    let closed = ViewScope::new();
    let open = ViewScope::new();
    let mut first = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client(&server.uri()),
        Arc::clone(&maps),
        14,
    );
    let mut second = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client(&server.uri()),
        Arc::clone(&maps),
        14,
    );

    let (closed_token, open_token) = (closed.token(), open.token());
    let teardown = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        closed.teardown();
    };
    let (a, b, ()) = tokio::join!(first.run(&closed_token), second.run(&open_token), teardown);

    assert!(a.map.is_none());
    assert!(b.map.is_some(), "surviving view gets the shared library");
    assert_eq!(b.markers_placed, 1);
    assert_eq!(maps.loaded().expect("library loaded").map_count(), 1);
}

#[tokio::test]
async fn current_error_follows_completion_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nearby_stations"))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps/api/js"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let scope = ViewScope::new();
    let mut pipeline = DiscoveryPipeline::new(
        ScriptedLocation::granted(Coordinate::new(1.0, 2.0)),
        test_client(&server.uri()),
        map_library(&server),
        14,
    );

    let state = pipeline.run(&scope.token()).await;

    assert_eq!(state.errors.map, Some(StageError::MapUnavailable));
    assert_eq!(state.errors.query, Some(StageError::QueryFailed));
    assert_eq!(state.errors.current(), Some(StageError::QueryFailed));
}
