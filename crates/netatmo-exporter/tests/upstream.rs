//! End-to-end tests against a local stand-in for the Netatmo API.
//!
//! The fake serves the OAuth2 token endpoint and `getstationsdata` on an
//! ephemeral port, so the real HTTP client, the collector and the router are
//! exercised together.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http_body_util::BodyExt;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;

use netatmo_core::{Collector, CollectorSettings, Credentials, Error, NetatmoClient, StationSource};
use netatmo_exporter::{AppState, api};

#[derive(Default)]
struct FakeApi {
    token_calls: AtomicUsize,
    data_calls: AtomicUsize,
    /// Refresh tokens presented to the token endpoint, in order.
    presented: Mutex<Vec<String>>,
    /// Reject the next data request as unauthorized.
    reject_next: AtomicBool,
    /// Reject every token request.
    revoked: AtomicBool,
}

async fn token(
    State(fake): State<Arc<FakeApi>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = fake.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let presented = form.get("refresh_token").cloned().unwrap_or_default();
    fake.presented.lock().await.push(presented);

    if fake.revoked.load(Ordering::SeqCst)
        || form.get("grant_type").map(String::as_str) != Some("refresh_token")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "access_token": format!("access-{n}"),
        "refresh_token": format!("refresh-{}", n + 1),
        "expires_in": 10800,
    }))
    .into_response()
}

async fn stations_data(State(fake): State<Arc<FakeApi>>, headers: HeaderMap) -> Response {
    fake.data_calls.fetch_add(1, Ordering::SeqCst);

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer access-"));
    if !authorized || fake.reject_next.swap(false, Ordering::SeqCst) {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "error": { "code": 3, "message": "Access token expired" }
            })),
        )
            .into_response();
    }

    let now = OffsetDateTime::now_utc().unix_timestamp();
    Json(serde_json::json!({
        "status": "ok",
        "body": {
            "devices": [{
                "_id": "70:ee:50:00:00:01",
                "station_name": "Home",
                "module_name": "Indoor",
                "wifi_status": 56,
                "dashboard_data": {
                    "time_utc": now,
                    "Temperature": 23.7,
                    "Humidity": 45,
                    "CO2": 612,
                    "Noise": 38,
                    "Pressure": 1013.2
                },
                "modules": [{
                    "_id": "02:00:00:00:00:02",
                    "module_name": "Garden",
                    "battery_percent": 74,
                    "rf_status": 68,
                    "dashboard_data": {
                        "time_utc": now,
                        "Temperature": -2.5,
                        "Humidity": 88
                    }
                }]
            }]
        }
    }))
    .into_response()
}

async fn spawn_fake() -> (String, Arc<FakeApi>) {
    let fake = Arc::new(FakeApi::default());
    let app = Router::new()
        .route("/oauth2/token", post(token))
        .route("/api/getstationsdata", get(stations_data))
        .with_state(Arc::clone(&fake));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), fake)
}

fn client(base_url: &str) -> NetatmoClient {
    NetatmoClient::new(
        base_url,
        Credentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh-1".to_string(),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_client_reads_stations() {
    let (url, fake) = spawn_fake().await;
    let client = client(&url);

    let stations = client.read().await.unwrap();
    assert_eq!(stations.len(), 1);
    assert_eq!(stations[0].name, "Home");
    assert_eq!(stations[0].measurements.temperature, Some(23.7));
    assert_eq!(stations[0].measurements.pressure, Some(1013.2));
    assert_eq!(stations[0].measurements.wifi_signal, Some(56.0));
    assert_eq!(stations[0].modules[0].name, "Garden");
    assert_eq!(stations[0].modules[0].measurements.battery_percent, Some(74.0));

    // The access token is cached between reads.
    client.read().await.unwrap();
    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.data_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_token_is_renewed_with_rotated_refresh_token() {
    let (url, fake) = spawn_fake().await;
    let client = client(&url);

    client.read().await.unwrap();

    fake.reject_next.store(true, Ordering::SeqCst);
    let err = client.read().await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 403, .. }));
    assert!(err.to_string().contains("Access token expired"));

    client.read().await.unwrap();
    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        *fake.presented.lock().await,
        vec!["refresh-1".to_string(), "refresh-2".to_string()]
    );
}

#[tokio::test]
async fn test_revoked_credentials() {
    let (url, fake) = spawn_fake().await;
    fake.revoked.store(true, Ordering::SeqCst);

    let err = client(&url).read().await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    assert!(err.to_string().contains("invalid_grant"));
    assert_eq!(fake.data_calls.load(Ordering::SeqCst), 0);
}

async fn scrape(state: &Arc<AppState>) -> String {
    let response = api::router()
        .with_state(Arc::clone(state))
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_exporter_serves_upstream_data() {
    let (url, fake) = spawn_fake().await;
    let collector = Collector::new(
        Arc::new(client(&url)),
        CollectorSettings {
            refresh_interval: Duration::from_secs(60),
            stale_threshold: Duration::from_secs(3600),
        },
    );
    let state = AppState::new(collector);

    let first = scrape(&state).await;
    assert!(first.contains("netatmo_up 0\n"));
    assert!(!first.contains("netatmo_sensor_"));

    state
        .collector
        .subscribe_refreshes()
        .wait_for(|c| *c >= 1)
        .await
        .unwrap();

    let body = scrape(&state).await;
    assert!(body.contains("netatmo_up 1\n"));
    assert!(body.contains(
        "netatmo_sensor_temperature_celsius{module=\"Home\",station=\"Home\"} 23.7\n"
    ));
    assert!(body.contains("netatmo_sensor_pressure_mb{module=\"Home\",station=\"Home\"} 1013.2\n"));
    assert!(body.contains(
        "netatmo_sensor_temperature_celsius{module=\"Garden\",station=\"Home\"} -2.5\n"
    ));
    assert!(body.contains("netatmo_sensor_rf_signal_strength{module=\"Garden\",station=\"Home\"} 68\n"));
    assert!(body.contains("netatmo_sensor_wifi_signal_strength{module=\"Home\",station=\"Home\"} 56\n"));
    assert_eq!(body.matches("netatmo_sensor_updated{").count(), 2);
    assert_eq!(fake.data_calls.load(Ordering::SeqCst), 1);
}
