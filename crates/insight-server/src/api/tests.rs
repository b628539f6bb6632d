use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, state::AppState};

const BASE_TIME: i64 = 1_736_150_400;

fn test_config() -> Config {
    let mut config = Config::from_env();
    config.data_path = std::env::temp_dir()
        .join(format!("insight-test-{}", uuid::Uuid::new_v4()))
        .join("flights.json");
    config.sample_secs = 60;
    config.analysis_timeout_ms = 30_000;
    config
}

fn setup_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let analysis = config.analysis_config().expect("analysis config");
    let state = Arc::new(AppState::new(config, analysis));
    let app = api::routes().with_state(state.clone());
    (app, state)
}

fn setup_app() -> (axum::Router, Arc<AppState>) {
    setup_with(test_config())
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn helicopter(acid: &str, departure_time: i64) -> Value {
    json!({
        "ACID": acid,
        "Plane type": "Bell 412 helicopter",
        "route": "45.00N/75.00W 45.50N/74.00W",
        "altitude": 5000,
        "departure time": departure_time,
        "aircraft speed": 60,
        "passengers": 8,
        "is_cargo": false
    })
}

fn trailing_pair() -> Value {
    json!([helicopter("HELI1", BASE_TIME), helicopter("HELI2", BASE_TIME + 60)])
}

#[tokio::test]
async fn health_echoes_request_id() {
    let (app, _state) = setup_app();

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-123")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "trace-123");

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let res = app.oneshot(req).await.unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn load_without_baseline_is_not_found() {
    let (app, _state) = setup_app();
    let req = Request::builder()
        .uri("/v1/flights")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = read_json(res).await;
    assert_eq!(body["error"], "no flight data available");
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let (app, state) = setup_app();

    let res = app
        .clone()
        .oneshot(json_request("PUT", "/v1/flights", trailing_pair()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["count"], 2);

    let req = Request::builder()
        .uri("/v1/flights")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body[0]["ACID"], "HELI1");
    assert_eq!(body[1]["departure time"], BASE_TIME + 60);

    // A second save keeps the first baseline as the backup.
    let res = app
        .oneshot(json_request("PUT", "/v1/flights", json!([helicopter("HELI9", BASE_TIME)])))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(state.store().backup_path().exists());
}

#[tokio::test]
async fn analyze_reports_conflict_and_proposals() {
    let (app, _state) = setup_app();

    let mut batch = trailing_pair();
    batch.as_array_mut().unwrap().push(json!("not a flight"));
    let res = app
        .oneshot(json_request("POST", "/v1/analyze", batch))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;

    let conflicts = body["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["pair_key"], "HELI1|HELI2");
    assert_eq!(conflicts[0]["severity_band"], "critical");

    let candidates = body["proposals"]["HELI1|HELI2"].as_array().unwrap();
    assert!(!candidates.is_empty());
    assert!(candidates
        .iter()
        .any(|c| c["action_type"] == "altitude"));

    let issues = body["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert!(body.get("trajectories").is_none());
}

#[tokio::test]
async fn analyze_can_include_trajectories() {
    let (app, _state) = setup_app();
    let res = app
        .oneshot(json_request(
            "POST",
            "/v1/analyze?include_trajectories=true",
            trailing_pair(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    let trajectories = body["trajectories"].as_array().unwrap();
    assert_eq!(trajectories.len(), 2);
    assert!(trajectories[0]["points"].as_array().unwrap().len() > 10);
}

#[tokio::test]
async fn empty_batch_analyzes_cleanly() {
    let (app, _state) = setup_app();
    let res = app
        .oneshot(json_request("POST", "/v1/analyze", json!([])))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["conflicts"], json!([]));
    assert_eq!(body["hotspots"], json!([]));
    assert_eq!(body["proposals"], json!({}));
}

#[tokio::test]
async fn stage_endpoints_return_their_slice() {
    let (app, _state) = setup_app();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/conflicts", trailing_pair()))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["conflicts"].as_array().unwrap().len(), 1);

    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/hotspots", trailing_pair()))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert!(body["hotspots"]
        .as_array()
        .unwrap()
        .iter()
        .all(|h| h["peak_density"].as_u64().unwrap() >= 2));

    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/proposals", trailing_pair()))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert!(body["proposals"]["HELI1|HELI2"].is_array());

    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/trajectories", trailing_pair()))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["trajectories"].as_array().unwrap().len(), 2);

    let mut batch = trailing_pair();
    batch.as_array_mut().unwrap().push(json!({
        "ACID": "LOST1",
        "Plane type": "Airbus A320",
        "route": "45.00N/75.00W",
        "altitude": 34000,
        "departure time": BASE_TIME,
        "aircraft speed": 450
    }));
    let res = app
        .oneshot(json_request("POST", "/v1/validate", batch))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["valid"], 2);
    let issues = body["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].as_str().unwrap().starts_with("LOST1"));
}

#[tokio::test]
async fn apply_changes_named_flight() {
    let (app, _state) = setup_app();
    let body = json!({
        "flights": trailing_pair(),
        "actions": [{ "flight_id": "HELI2", "delta_altitude_ft": 2000 }]
    });
    let res = app
        .oneshot(json_request("POST", "/v1/apply", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    let revised = body["revised"].as_array().unwrap();
    assert_eq!(revised[0]["altitude"], 5000);
    assert_eq!(revised[1]["altitude"], 7000);
    assert_eq!(revised[1]["route"], "45.00N/75.00W 45.50N/74.00W");
}

#[tokio::test]
async fn apply_unknown_flight_is_not_found() {
    let (app, _state) = setup_app();
    let body = json!({
        "flights": trailing_pair(),
        "actions": [{ "flight_id": "GHOST", "delta_speed_kt": 10 }]
    });
    let res = app
        .oneshot(json_request("POST", "/v1/apply", body))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = read_json(res).await;
    assert_eq!(body["error"], "unknown flight: GHOST");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (app, _state) = setup_app();
    let req = Request::builder()
        .method("POST")
        .uri("/v1/analyze")
        .header("content-type", "application/json")
        .body(Body::from("[{\"ACID\": "))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn exhausted_budget_is_service_unavailable() {
    let mut config = test_config();
    config.analysis_timeout_ms = 0;
    let (app, _state) = setup_with(config);
    let res = app
        .oneshot(json_request("POST", "/v1/analyze", trailing_pair()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json(res).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("analysis exceeded its time budget"));
}
