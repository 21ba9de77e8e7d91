//! Full screen flows against a mock HTTP backend: the real gateway,
//! a real event channel, and the reducer — only the network is fake.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::{self, Receiver};
use toolmap::api::http::HttpGateway;
use toolmap::api::types::{Coordinate, UserRecord};
use toolmap::core::controller::{MapScreen, ScreenEvent};
use toolmap::core::state::{Phase, Region};
use toolmap::location::FixedLocation;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn home() -> Coordinate {
    Coordinate { latitude: 51.5072, longitude: -0.1276 }
}

fn signed_in_user() -> UserRecord {
    UserRecord {
        profile_id: 0,
        display_name: "You".to_string(),
        bio: String::new(),
        coordinate: home(),
        picture_url: None,
    }
}

fn screen_against(
    server: &MockServer,
    consent: bool,
) -> (MapScreen, Receiver<ScreenEvent>) {
    let gateway = Arc::new(HttpGateway::new(
        server.uri(),
        Some(server.uri()),
        "test-key".to_string(),
    ));
    let location = Arc::new(FixedLocation::new(
        Coordinate { latitude: 53.48, longitude: -2.24 },
        consent,
    ));
    let (tx, rx) = mpsc::channel(32);
    let user = signed_in_user();
    let region = Region::centered_on(user.coordinate, 0.75, 0.75);
    (MapScreen::new(gateway, location, user, region, tx), rx)
}

async fn drain(screen: &mut MapScreen, rx: &mut Receiver<ScreenEvent>) {
    while !screen.is_idle() {
        let event = rx
            .recv()
            .await
            .expect("event channel closed while tasks in flight");
        screen.handle_event(event);
    }
}

/// Mounts the usual two-lender directory on the mock server.
async fn mount_directory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "profile_id": 1,
                    "display_name": "Ann",
                    "bio": "Happy to lend",
                    "latitude": 51.5,
                    "longitude": -0.1
                },
                {
                    "profile_id": 2,
                    "display_name": "Bea",
                    "bio": "",
                    "latitude": 53.48,
                    "longitude": -2.24
                },
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"listing_id": 10, "owner_id": 1, "tool": "Drill", "description": ""},
                {"listing_id": 11, "owner_id": 2, "tool": "Saw", "description": ""},
                {"listing_id": 12, "owner_id": 9, "tool": "Ladder", "description": ""},
            ]
        })))
        .mount(server)
        .await;
}

// ============================================================================
// Mount Flow Tests
// ============================================================================

#[tokio::test]
async fn test_mount_settles_into_ready_with_markers() {
    let mock_server = MockServer::start().await;
    mount_directory(&mock_server).await;

    let (mut screen, mut rx) = screen_against(&mock_server, true);
    screen.mount();
    drain(&mut screen, &mut rx).await;

    assert_eq!(screen.state.phase, Phase::Ready);
    // Region follows the device fix, not the signed-in user's home.
    assert_eq!(screen.state.region.center.latitude, 53.48);
    assert_eq!(screen.current_user().coordinate.latitude, 53.48);
    // Two lenders, one orphaned listing dropped.
    assert_eq!(screen.state.markers.len(), 2);
    assert_eq!(screen.state.markers[0].owner.display_name, "Ann");
    assert_eq!(screen.state.markers[0].listings.len(), 1);
    assert_eq!(screen.state.markers[1].listings.len(), 1);
}

#[tokio::test]
async fn test_denied_consent_still_loads_the_directory() {
    let mock_server = MockServer::start().await;
    mount_directory(&mock_server).await;

    let (mut screen, mut rx) = screen_against(&mock_server, false);
    screen.mount();
    drain(&mut screen, &mut rx).await;

    assert_eq!(screen.state.phase, Phase::PermissionDenied);
    assert!(
        screen
            .state
            .notice
            .as_deref()
            .unwrap()
            .contains("permission")
    );
    // The map data is there for when the user grants access.
    assert_eq!(screen.state.markers.len(), 2);
    // Region never moved off the signed-in user's home.
    assert_eq!(screen.state.region.center, home());
}

#[tokio::test]
async fn test_directory_outage_is_an_inline_notice() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profiles"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/listings"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;

    let (mut screen, mut rx) = screen_against(&mock_server, true);
    screen.mount();
    drain(&mut screen, &mut rx).await;

    // The screen still came up; the outage is a notice, not a crash.
    assert_eq!(screen.state.phase, Phase::Ready);
    assert!(screen.state.notice.is_some());
    assert!(screen.state.markers.is_empty());
}

// ============================================================================
// Address Lookup Flow Tests
// ============================================================================

#[tokio::test]
async fn test_postcode_submission_recenters_the_region() {
    let mock_server = MockServer::start().await;
    mount_directory(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .and(query_param("address", "SW1A 1AA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [
                {"formatted_address": "London SW1A 1AA, UK", "place_id": "place-a"}
            ]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps/api/place/details/json"))
        .and(query_param("place_id", "place-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "result": {"geometry": {"location": {"lat": 51.501, "lng": -0.1416}}}
        })))
        .mount(&mock_server)
        .await;

    let (mut screen, mut rx) = screen_against(&mock_server, true);
    screen.mount();
    drain(&mut screen, &mut rx).await;

    screen.submit_address("SW1A 1AA");
    assert_eq!(screen.state.phase, Phase::AddressResolving);
    drain(&mut screen, &mut rx).await;

    assert_eq!(screen.state.phase, Phase::Ready);
    assert_eq!(screen.state.region.center.latitude, 51.501);
    assert_eq!(screen.state.region.center.longitude, -0.1416);
    assert_eq!(
        screen.state.resolved_address.as_deref(),
        Some("London SW1A 1AA, UK")
    );
    // Spans don't change on recenter.
    assert_eq!(screen.state.region.latitude_delta, 0.75);
}

#[tokio::test]
async fn test_unknown_postcode_leaves_region_and_recovers() {
    let mock_server = MockServer::start().await;
    mount_directory(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ZERO_RESULTS"
        })))
        .mount(&mock_server)
        .await;

    let (mut screen, mut rx) = screen_against(&mock_server, true);
    screen.mount();
    drain(&mut screen, &mut rx).await;
    let region_before = screen.state.region;

    screen.submit_address("ZZ99 9ZZ");
    drain(&mut screen, &mut rx).await;

    assert_eq!(screen.state.phase, Phase::AddressError);
    assert_eq!(screen.state.region, region_before);
    assert_eq!(screen.state.notice.as_deref(), Some("no matching places"));

    // Dismissing the notice puts the screen back to work.
    screen.dismiss_notice();
    assert_eq!(screen.state.phase, Phase::Ready);
    assert!(screen.state.notice.is_none());
}

#[tokio::test]
async fn test_stale_place_id_between_the_two_calls() {
    let mock_server = MockServer::start().await;
    mount_directory(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [
                {"formatted_address": "London SW1A 1AA, UK", "place_id": "place-a"}
            ]
        })))
        .mount(&mock_server)
        .await;
    // The id expired before the details call.
    Mock::given(method("GET"))
        .and(path("/maps/api/place/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "NOT_FOUND"
        })))
        .mount(&mock_server)
        .await;

    let (mut screen, mut rx) = screen_against(&mock_server, true);
    screen.mount();
    drain(&mut screen, &mut rx).await;
    let region_before = screen.state.region;

    screen.submit_address("SW1A 1AA");
    drain(&mut screen, &mut rx).await;

    assert_eq!(screen.state.phase, Phase::AddressError);
    assert_eq!(screen.state.region, region_before);
    assert!(
        screen
            .state
            .notice
            .as_deref()
            .unwrap()
            .contains("not found")
    );
}
