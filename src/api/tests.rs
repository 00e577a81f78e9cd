use super::server::{ApiServer, ApiServerBuilder};
use super::API_KEY_HEADER;
use crate::config::GesturepadConfig;
use crate::events::{EventBus, GesturepadEvent};
use crate::gesture::GestureSnapshot;
use crate::profile::{Profile, ProfileStore};
use crate::telemetry::{TelemetrySnapshot, TelemetryStore};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct Fixture {
    _dir: TempDir,
    server: ApiServer,
    telemetry: Arc<TelemetryStore>,
    event_bus: Arc<EventBus>,
    shutdown: CancellationToken,
}

async fn fixture_with(configure: impl FnOnce(&mut GesturepadConfig, &TempDir)) -> Fixture {
    let dir = TempDir::new().unwrap();
    let mut config = GesturepadConfig::default();
    config.overlay.font_path = "/nonexistent/font.ttf".to_string();
    config.api.dashboard_dir = dir.path().join("dashboard").display().to_string();
    configure(&mut config, &dir);

    let profiles = ProfileStore::open(
        dir.path().join("profiles"),
        dir.path().join("runtime/active_profile.txt"),
        Profile::new("default"),
    )
    .await
    .unwrap();
    let telemetry = Arc::new(TelemetryStore::in_memory(50));
    let event_bus = Arc::new(EventBus::new(16));
    let shutdown = CancellationToken::new();

    let server = ApiServerBuilder::new()
        .config(Arc::new(config))
        .profiles(profiles)
        .telemetry(telemetry.clone())
        .event_bus(event_bus.clone())
        .shutdown(shutdown.clone())
        .build()
        .unwrap();

    Fixture {
        _dir: dir,
        server,
        telemetry,
        event_bus,
        shutdown,
    }
}

async fn fixture() -> Fixture {
    fixture_with(|_, _| {}).await
}

async fn send(server: &ApiServer, request: Request<Body>) -> Response {
    server.router().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_builder_requires_components() {
    let result = ApiServerBuilder::new()
        .config(Arc::new(GesturepadConfig::default()))
        .build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_health() {
    let fx = fixture().await;
    let response = send(&fx.server, get("/v1/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"status": "ok", "service": "gesturepad-api"})
    );
}

#[tokio::test]
async fn test_api_key_guard() {
    let fx = fixture_with(|config, _| config.api.api_key = "secret".to_string()).await;

    // health stays open
    let response = send(&fx.server, get("/v1/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&fx.server, get("/v1/profiles")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["detail"],
        "Invalid or missing API key."
    );

    let wrong = Request::builder()
        .uri("/v1/profiles")
        .header(API_KEY_HEADER, "guess")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&fx.server, wrong).await.status(), StatusCode::UNAUTHORIZED);

    let right = Request::builder()
        .uri("/v1/profiles")
        .header(API_KEY_HEADER, "secret")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&fx.server, right).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_config_view() {
    let fx = fixture_with(|config, _| config.api.api_key = "secret".to_string()).await;
    let request = Request::builder()
        .uri("/v1/config")
        .header(API_KEY_HEADER, "secret")
        .body(Body::empty())
        .unwrap();
    let body = body_json(send(&fx.server, request).await).await;

    assert_eq!(body["active_profile"], "default");
    assert_eq!(body["api_key_enabled"], true);
    assert_eq!(body["api_port"], 8000);
    assert_eq!(body["keys"]["jump"], "up");
    assert!(body.get("api_key").is_none());
}

#[tokio::test]
async fn test_list_and_get_profiles() {
    let fx = fixture().await;

    let body = body_json(send(&fx.server, get("/v1/profiles")).await).await;
    assert_eq!(body["active"], "default");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["name"], "default");

    let response = send(&fx.server, get("/v1/profiles/default")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["cooldown_ms"], 220);

    let response = send(&fx.server, get("/v1/profiles/missing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&fx.server, get("/v1/profiles/bad.name")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_put_profile_fills_defaults() {
    let fx = fixture().await;

    let response = send(
        &fx.server,
        with_json(Method::PUT, "/v1/profiles/speedrun", json!({"cooldown_ms": 120})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "saved");
    assert_eq!(body["profile"]["name"], "speedrun");
    assert_eq!(body["profile"]["description"], "Custom profile");
    assert_eq!(body["profile"]["left_bound"], 0.35);
    assert_eq!(body["profile"]["cooldown_ms"], 120);

    let response = send(&fx.server, get("/v1/profiles/speedrun")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_put_profile_rejects_invalid_values() {
    let fx = fixture().await;

    let response = send(
        &fx.server,
        with_json(
            Method::PUT,
            "/v1/profiles/broken",
            json!({"left_bound": 0.7, "right_bound": 0.3}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &fx.server,
        with_json(Method::PUT, "/v1/profiles/broken", json!({"cooldown_ms": 5000})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method(Method::PUT)
        .uri("/v1/profiles/broken")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&fx.server, malformed).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"].is_string());

    let response = send(&fx.server, get("/v1/profiles/broken")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_activate_profile_notifies_bus() {
    let fx = fixture().await;
    let mut events = fx.event_bus.subscribe();

    send(
        &fx.server,
        with_json(Method::PUT, "/v1/profiles/casual", json!({"cooldown_ms": 400})),
    )
    .await;

    let response = send(
        &fx.server,
        Request::builder()
            .method(Method::POST)
            .uri("/v1/profiles/casual/activate")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "activated");
    assert_eq!(body["profile"]["cooldown_ms"], 400);

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, GesturepadEvent::ProfileActivated { name } if name == "casual"));

    let body = body_json(send(&fx.server, get("/v1/profiles")).await).await;
    assert_eq!(body["active"], "casual");

    let response = send(
        &fx.server,
        Request::builder()
            .method(Method::POST)
            .uri("/v1/profiles/ghost/activate")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_telemetry_history() {
    let fx = fixture().await;

    let body = body_json(send(&fx.server, get("/v1/telemetry")).await).await;
    assert!(body["latest"].is_null());
    assert_eq!(body["history"], json!([]));

    for fps in [10, 20, 30] {
        let snapshot = TelemetrySnapshot::new(&GestureSnapshot::no_hand(), fps, "default");
        fx.telemetry.publish(snapshot).await.unwrap();
    }

    let body = body_json(send(&fx.server, get("/v1/telemetry?limit=2")).await).await;
    assert_eq!(body["latest"]["fps"], 30);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["fps"], 20);
    assert_eq!(history[1]["fps"], 30);
}

#[tokio::test]
async fn test_telemetry_limit_is_clamped() {
    let fx = fixture().await;
    for fps in [10, 20] {
        let snapshot = TelemetrySnapshot::new(&GestureSnapshot::no_hand(), fps, "default");
        fx.telemetry.publish(snapshot).await.unwrap();
    }

    let body = body_json(send(&fx.server, get("/v1/telemetry?limit=-1")).await).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["fps"], 20);

    let body = body_json(send(&fx.server, get("/v1/telemetry?limit=100000")).await).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 2);

    let response = send(&fx.server, get("/v1/telemetry?limit=many")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_telemetry_stream_ends_on_shutdown() {
    let fx = fixture().await;

    let response = send(&fx.server, get("/v1/telemetry/stream")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body().into_data_stream();

    fx.shutdown.cancel();

    // keep-alive comments may still arrive before the end of the body
    let ended = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(chunk) = body.next().await {
            chunk.unwrap();
        }
    })
    .await;
    assert!(ended.is_ok());
}

#[tokio::test]
async fn test_server_stops_with_open_telemetry_stream() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let fx = fixture_with(|config, _| {
        config.api.host = "127.0.0.1".to_string();
        config.api.port = port;
    })
    .await;
    let address = fx.server.address();

    let shutdown = CancellationToken::new();
    let server = fx.server;
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { server.start(token).await });

    let mut stream = None;
    for _ in 0..50 {
        match TcpStream::connect(&address).await {
            Ok(connected) => {
                stream = Some(connected);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    let mut stream = stream.unwrap();
    stream
        .write_all(b"GET /v1/telemetry/stream HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut buffer = [0u8; 512];
    let read = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buffer))
        .await
        .unwrap()
        .unwrap();
    assert!(String::from_utf8_lossy(&buffer[..read]).starts_with("HTTP/1.1 200 OK"));

    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_telemetry_stream_emits_events() {
    let fx = fixture().await;

    let response = send(&fx.server, get("/v1/telemetry/stream")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let snapshot = TelemetrySnapshot::new(&GestureSnapshot::no_hand(), 25, "default");
    fx.telemetry.publish(snapshot).await.unwrap();

    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(1), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("event: telemetry"));
    assert!(text.contains("\"fps\":25"));
}

#[cfg(feature = "overlay")]
#[tokio::test]
async fn test_overlay_jpeg() {
    let fx = fixture().await;
    let response = send(&fx.server, get("/v1/overlay.jpg")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_overlay_disabled() {
    let fx = fixture_with(|config, _| config.overlay.enabled = false).await;
    let response = send(&fx.server, get("/v1/overlay.jpg")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_root_without_dashboard() {
    let fx = fixture().await;
    let response = send(&fx.server, get("/")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("/v1/health"));
}

#[tokio::test]
async fn test_root_redirects_to_dashboard() {
    let fx = fixture_with(|_, dir| {
        let dashboard = dir.path().join("dashboard");
        std::fs::create_dir_all(&dashboard).unwrap();
        std::fs::write(dashboard.join("index.html"), "<h1>dashboard</h1>").unwrap();
    })
    .await;

    let response = send(&fx.server, get("/")).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/dashboard/");

    let response = send(&fx.server, get("/dashboard/index.html")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>dashboard</h1>");
}
