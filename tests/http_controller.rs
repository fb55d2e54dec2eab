//! Drives `HttpController` and a full `Surface` against an in-process mock device

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use irrigation_console::{
    services::{ActionReply, ActionRequest, Controller, HttpController},
    ActionError, FetchError, Surface, SurfaceConfig,
};

#[derive(Default)]
struct Device {
    zones: Vec<Value>,
    posted: Vec<(String, Value)>,
    refuse_starts: bool,
}

type Shared = Arc<Mutex<Device>>;

async fn zones(State(device): State<Shared>) -> Json<Value> {
    Json(Value::Array(device.lock().unwrap().zones.clone()))
}

async fn program_state() -> Json<Value> {
    Json(json!({"program_running": false, "current_program_id": null}))
}

async fn settings() -> Json<Value> {
    Json(json!({
        "zones": [
            {"id": 0, "name": "Prato", "status": "show", "pin": 14},
            {"id": 1, "name": "Orto", "status": "show", "pin": 15},
            {"id": 2, "name": "", "status": "hide", "pin": 16}
        ],
        "max_active_zones": 2,
        "max_zone_duration": 60
    }))
}

async fn programs() -> Json<Value> {
    Json(json!({
        "1": {
            "name": "Mattina",
            "recurrence": "giornaliero",
            "activation_time": "06:30",
            "months": ["Giugno"],
            "steps": [{"zone_id": 0, "duration": 10}]
        }
    }))
}

async fn start_zone(State(device): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    let mut device = device.lock().unwrap();
    device.posted.push(("/start_zone".into(), body.clone()));
    if device.refuse_starts {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Max active zones reached"})),
        );
    }
    let seconds = body["duration"].as_u64().unwrap_or(0) * 60;
    let id = body["zone_id"].clone();
    device.zones = vec![json!({"id": id, "active": true, "remaining_time": seconds})];
    (StatusCode::OK, Json(json!({"success": true})))
}

async fn broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn not_json() -> &'static str {
    "<html>not json</html>"
}

async fn spawn_device(device: Shared) -> String {
    let app = Router::new()
        .route("/get_zones_status", get(zones))
        .route("/get_program_state", get(program_state))
        .route("/data/user_settings.json", get(settings))
        .route("/data/program.json", get(programs))
        .route("/start_zone", post(start_zone))
        .route("/stop_program", post(broken))
        .nest("/html", Router::new().route("/get_zones_status", get(not_json)))
        .with_state(device);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn client(base_url: &str) -> HttpController {
    HttpController::new(base_url, Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn reads_configuration_and_snapshots() {
    let device = Shared::default();
    device.lock().unwrap().zones = vec![json!({"id": 1, "active": true, "remaining_time": 90})];
    let controller = client(&spawn_device(Arc::clone(&device)).await);
    assert!(!controller.base_url().ends_with('/'));

    let settings = controller.load_settings().await.unwrap();
    assert_eq!(settings.zones.len(), 3);
    assert_eq!(settings.max_zone_duration, 60);
    assert_eq!(settings.activation_delay, 5);

    let programs = controller.load_programs().await.unwrap().into_ordered();
    assert_eq!(programs[0].id, "1");
    assert_eq!(programs[0].recurrence_label(), "daily");

    let zones = controller.get_zones_status().await.unwrap();
    assert_eq!(zones[0].id, 1);
    assert_eq!(zones[0].remaining_time, 90);

    let run_state = controller.get_program_state().await.unwrap();
    assert!(run_state.current().is_none());
}

#[tokio::test]
async fn refused_action_keeps_device_reason() {
    let device = Shared::default();
    device.lock().unwrap().refuse_starts = true;
    let controller = client(&spawn_device(Arc::clone(&device)).await);

    let reply = controller
        .send(&ActionRequest::StartZone { zone_id: 0, duration_minutes: 5 })
        .await
        .unwrap();
    assert_eq!(reply, ActionReply::rejected("Max active zones reached"));
    assert_eq!(
        device.lock().unwrap().posted,
        vec![("/start_zone".to_string(), json!({"zone_id": 0, "duration": 5}))]
    );
}

#[tokio::test]
async fn status_and_body_failures_are_classified() {
    let device = Shared::default();
    let base = spawn_device(device).await;
    let controller = client(&base);

    let failed = controller.send(&ActionRequest::StopProgram).await;
    assert_eq!(failed, Err(FetchError::Status { status: 500 }));

    let html = client(&format!("{base}html"));
    assert!(matches!(html.get_zones_status().await, Err(FetchError::Malformed(_))));

    let missing = client(&format!("{base}nowhere"));
    assert!(matches!(
        missing.get_zones_status().await,
        Err(FetchError::Status { status: 404 })
    ));

    let nothing = client("http://127.0.0.1:9");
    assert!(matches!(nothing.get_zones_status().await, Err(FetchError::Transport(_))));
}

#[tokio::test]
async fn surface_reflects_a_started_zone() {
    let device = Shared::default();
    let controller = Arc::new(client(&spawn_device(Arc::clone(&device)).await));
    let config = SurfaceConfig { poll_interval: Duration::from_millis(200) };
    let surface = Surface::initialize(controller, config).await.unwrap();

    let view = surface.view();
    assert_eq!(view.zones.len(), 2);
    assert_eq!(view.programs[0].name, "Mattina");
    assert_eq!(view.programs[0].steps[0].zone_name, "Prato");

    let over = surface.start_zone(1, 61.0).await;
    assert!(matches!(over, Err(ActionError::Validation(_))));
    assert!(device.lock().unwrap().posted.is_empty());

    surface.start_zone(1, 10.0).await.unwrap();
    let mut view_rx = surface.subscribe_view();
    let started = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            if view_rx.borrow_and_update().zone(1).is_some_and(|z| z.active && z.remaining_seconds > 0) {
                return;
            }
            view_rx.changed().await.unwrap();
        }
    })
    .await;
    assert!(started.is_ok());
    assert_eq!(surface.view().zone(1).unwrap().markers.len(), 1);

    surface.teardown();
}
