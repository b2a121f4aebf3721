use std::{convert::Infallible, path::PathBuf, time::Duration};

use async_trait::async_trait;
use serde_json::{json, Value};
use warp::{http::StatusCode, reply::Response, Filter, Reply};

use rackled::{
    device::{DeviceError, DummyDevice, PatchSender},
    global::{Global, GlobalData},
    models::Config,
    patch::Patch,
    web::{self, WebConfig},
};

const CONFIG: &str = r#"
{
    "common": {
        "left": { "length": 57, "start": 1, "reverse": true },
        "top": { "length": 20, "start": 58 },
        "right": { "length": 60, "start": 78, "calibration": { "offset": 1 } },
        "bottom": { "length": 20, "start": 138, "reverse": true }
    },
    "rack_units": [
        { "id": "top-bar", "top": { "start": 5, "length": 10 } }
    ],
    "equipments": [
        { "id": "sw1", "name": "Core switch", "rack_units": [41, 42] },
        { "id": "empty", "name": "Not mounted", "rack_units": [] }
    ]
}"#;

/// Controller that never answers
struct Unreachable;

#[async_trait]
impl PatchSender for Unreachable {
    async fn send(&self, _patch: &Patch) -> Result<(), DeviceError> {
        Err(DeviceError::Rejected(reqwest::StatusCode::SERVICE_UNAVAILABLE))
    }
}

fn server(
    device: Box<dyn PatchSender>,
) -> (
    Global,
    impl Filter<Extract = (Response,), Error = Infallible> + Clone + 'static,
) {
    let config = Config::from_json_str(CONFIG).unwrap();
    let global = GlobalData::new(&config, device).wrap();

    let routes = web::routes(
        global.clone(),
        &WebConfig {
            address: ([127, 0, 0, 1], 0).into(),
            document_root: PathBuf::from("web"),
            upstream: None,
        },
    );

    (global, routes)
}

fn dummy() -> (
    DummyDevice,
    Global,
    impl Filter<Extract = (Response,), Error = Infallible> + Clone + 'static,
) {
    let device = DummyDevice::new();
    let (global, routes) = server(Box::new(device.clone()));
    (device, global, routes)
}

async fn post<F>(routes: &F, path: &str, body: Value) -> (StatusCode, Value)
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let response = warp::test::request()
        .method("POST")
        .path(path)
        .json(&body)
        .reply(routes)
        .await;

    (
        response.status(),
        serde_json::from_slice(response.body()).unwrap(),
    )
}

async fn request<F>(routes: &F, method: &str, path: &str) -> (StatusCode, Value)
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let response = warp::test::request()
        .method(method)
        .path(path)
        .reply(routes)
        .await;

    (
        response.status(),
        serde_json::from_slice(response.body()).unwrap(),
    )
}

fn all_black(status: &Value) -> bool {
    status["states"]
        .as_object()
        .unwrap()
        .values()
        .flat_map(|side| side.as_array().unwrap())
        .all(|entry| entry["color"] == "#000000")
}

#[tokio::test]
async fn status_reports_geometry() {
    let (_, _, routes) = dummy();
    let (status, body) = request(&routes, "GET", "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verticalHeight"], 126);
    assert_eq!(body["config"]["right"], 60);
    assert_eq!(body["equipments"][0]["rack_units"], json!([41, 42]));
    assert_eq!(body["states"]["left"].as_array().unwrap().len(), 57);
    assert!(all_black(&body));
}

#[tokio::test]
async fn out_of_range_index_leaves_state_unchanged() {
    let (device, _, routes) = dummy();

    let (status, body) = post(
        &routes,
        "/api/led/left",
        json!({ "leds": [{ "index": 0, "color": "#00FF00" }, { "index": 999, "color": "#FF0000" }] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("999"));
    assert!(device.patches().is_empty());

    let (_, body) = request(&routes, "GET", "/api/status").await;
    assert!(all_black(&body));
}

#[tokio::test]
async fn set_leds() {
    let (device, _, routes) = dummy();

    let (status, body) = post(
        &routes,
        "/api/led/left",
        json!({ "leds": [{ "index": 0, "color": "#00ff00" }, { "index": 56, "color": "0000FF" }] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(
        serde_json::to_value(device.last().unwrap()).unwrap(),
        json!({ "seg": { "i": [57, "00FF00", 1, "0000FF"] } })
    );

    let (_, body) = request(&routes, "GET", "/api/status").await;
    assert_eq!(body["states"]["left"][0]["color"], "#00FF00");
}

#[tokio::test]
async fn invalid_side_and_body() {
    let (device, _, routes) = dummy();

    let (status, _) = post(&routes, "/api/led/middle", json!({ "leds": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&routes, "/api/led/left", json!({ "leds": 3 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&routes, "/api/rack-unit-u/3", json!({ "color": "blue" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&routes, "/api/rack-unit-u/3", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(device.patches().is_empty());
}

#[tokio::test]
async fn clear_then_status_is_black() {
    let (device, _, routes) = dummy();

    let (status, _) = request(&routes, "POST", "/api/reset").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = request(&routes, "GET", "/api/status").await;
    assert_eq!(body["states"]["bottom"][19]["color"], "#FFFFFF");

    let (status, body) = request(&routes, "POST", "/api/clear").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All LEDs cleared (black #000000)");

    let (_, body) = request(&routes, "GET", "/api/status").await;
    assert!(all_black(&body));
    assert_eq!(device.patches().len(), 2);
}

#[tokio::test]
async fn light_unit_details() {
    let (_, _, routes) = dummy();
    let (status, body) = post(&routes, "/api/rack-unit-u/1", json!({ "color": "#ff0000" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vStart"], 0);
    assert_eq!(body["vLength"], 3);
    assert_eq!(body["rackUnitsCount"], 42);
    assert_eq!(
        body["details"][0],
        json!({ "side": "left", "u": 1, "v": 0, "localIndex": 0, "globalIndex": 57, "color": "#FF0000" })
    );
    assert_eq!(body["details"].as_array().unwrap().len(), 6);

    let (status, _) = post(&routes, "/api/rack-unit-u/43", json!({ "color": "#ff0000" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&routes, "/api/rack-unit-u/abc", json!({ "color": "#ff0000" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_command_is_idempotent() {
    let (device, _, routes) = dummy();

    post(&routes, "/api/rack-unit-u/range/4-2", json!({ "color": "#123456" })).await;
    let (_, first) = request(&routes, "GET", "/api/status").await;

    post(&routes, "/api/rack-unit-u/range/2-4", json!({ "color": "#123456" })).await;
    let (_, second) = request(&routes, "GET", "/api/status").await;

    let patches = device.patches();
    assert_eq!(patches.len(), 2);
    assert_eq!(patches[0], patches[1]);
    assert_eq!(first["states"], second["states"]);
}

#[tokio::test]
async fn malformed_range() {
    let (device, _, routes) = dummy();

    for path in &["/api/rack-unit-u/range/4", "/api/rack-unit-u/range/a-b"] {
        let (status, body) = post(&routes, path, json!({ "color": "#123456" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert!(body["error"].is_string());
    }

    let (status, _) = post(&routes, "/api/rack-unit-u/range/4/blink", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(device.patches().is_empty());
}

#[tokio::test]
async fn equipment() {
    let (device, _, routes) = dummy();

    let (status, body) = post(&routes, "/api/equipment/sw1", json!({ "color": "#00FF00" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["units"], json!([41, 42]));
    assert_eq!(body["sides"], json!(["left", "right"]));
    assert_eq!(body["leds"], 12);

    for id in &["nope", "empty"] {
        let (status, _) = post(
            &routes,
            &format!("/api/equipment/{}", id),
            json!({ "color": "#00FF00" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", id);
    }

    assert_eq!(device.patches().len(), 1);
}

#[tokio::test]
async fn catalog_rack_unit() {
    let (_, _, routes) = dummy();

    let (status, body) = post(&routes, "/api/rack-unit/top-bar", json!({ "color": "#00FF00" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leds"], 10);

    let (status, _) = post(&routes, "/api/rack-unit/nope", json!({ "color": "#00FF00" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn side_test() {
    let (_, _, routes) = dummy();

    let (status, body) = request(&routes, "POST", "/api/test/side/top").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leds"], 20);
    assert_eq!(body["details"][0]["color"], "#0000FF");
    assert_eq!(body["details"][19]["color"], "#FF0000");

    let (status, _) = request(&routes, "POST", "/api/test/side/middle").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn device_failure_is_a_server_error() {
    let (global, routes) = server(Box::new(Unreachable));

    let (status, body) = request(&routes, "POST", "/api/clear").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("503"));

    let (status, _) = post(&routes, "/api/rack-unit-u/1", json!({ "color": "#FF0000" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // Validation still comes first
    let (status, _) = post(&routes, "/api/rack-unit-u/0", json!({ "color": "#FF0000" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Background failures are only logged
    let (status, _) = post(&routes, "/api/rack-unit-u/1/blink", json!({ "times": 5 })).await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..100 {
        if global.tasks().list().await.is_empty() {
            return;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("failed blink task is still registered");
}

#[tokio::test(start_paused = true)]
async fn blink_is_acknowledged_immediately() {
    let (device, _, routes) = dummy();

    let (status, body) = post(
        &routes,
        "/api/rack-unit-u/2/blink",
        json!({ "color": "#FFFF00", "times": 2, "interval": 100 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sides"], json!(["left", "right"]));
    let task_id = body["taskId"].as_str().unwrap().to_owned();

    let (_, tasks) = request(&routes, "GET", "/api/tasks").await;
    assert_eq!(tasks[0]["id"], task_id.as_str());
    assert_eq!(tasks[0]["kind"], "blinkUnit");

    tokio::time::sleep(Duration::from_secs(1)).await;

    let (_, tasks) = request(&routes, "GET", "/api/tasks").await;
    assert_eq!(tasks, json!([]));
    assert_eq!(device.patches().len(), 4);

    let (_, body) = request(&routes, "GET", "/api/status").await;
    assert!(all_black(&body));
}

#[tokio::test]
async fn cancel_tasks() {
    let (_, _, routes) = dummy();

    let (_, body) = post(
        &routes,
        "/api/equipment/sw1/blink",
        json!({ "times": 1000, "interval": 1000 }),
    )
    .await;
    let task_id = body["taskId"].as_str().unwrap().to_owned();

    let (status, _) = request(&routes, "DELETE", "/api/tasks/not-a-task").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = request(&routes, "DELETE", &format!("/api/tasks/{}", task_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["equipment"], "sw1");

    let (status, body) = request(&routes, "DELETE", "/api/tasks").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["cancelled"].is_number());
}

#[tokio::test]
async fn scan_validation() {
    let (_, _, routes) = dummy();

    let (status, _) = post(&routes, "/api/test/scan-u", json!({ "from": 1, "to": 2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(
        &routes,
        "/api/test/scan-u",
        json!({ "from": 2, "to": 1, "times": 1, "interval": 1, "pauseBetweenUnits": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("Starting U scan from U2 down to U1"));
}

#[tokio::test]
async fn unknown_route() {
    let (_, _, routes) = dummy();
    let (status, body) = request(&routes, "GET", "/api/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn live_view_requires_a_host() {
    let (_, _, routes) = dummy();

    let response = warp::test::request()
        .path("/api/wled-ws")
        .header("connection", "upgrade")
        .header("upgrade", "websocket")
        .header("sec-websocket-version", "13")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn live_view_without_upgrade() {
    let (_, _, routes) = dummy();
    let (status, body) = request(&routes, "GET", "/api/wled-ws").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "expected a websocket upgrade request");
}
