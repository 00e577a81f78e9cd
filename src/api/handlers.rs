use crate::error::{GesturepadError, ProfileError};
use crate::events::GesturepadEvent;
use crate::profile::Profile;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect, Response,
    },
    Json,
};
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use super::server::ApiState;

const DEFAULT_TELEMETRY_LIMIT: i64 = 30;

/// Error body returned by every endpoint: `{"detail": "..."}`
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    detail: String,
}

impl ApiFailure {
    pub fn new<S: Into<String>>(status: StatusCode, detail: S) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Invalid or missing API key.")
    }
}

impl From<GesturepadError> for ApiFailure {
    fn from(err: GesturepadError) -> Self {
        let status = match &err {
            GesturepadError::Profile(ProfileError::NotFound { .. }) => StatusCode::NOT_FOUND,
            GesturepadError::Profile(ProfileError::InvalidName { .. })
            | GesturepadError::Profile(ProfileError::Validation { .. })
            | GesturepadError::InvalidConfiguration { .. } => StatusCode::BAD_REQUEST,
            _ => {
                error!("API request failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let detail = match err {
            GesturepadError::Profile(inner) => inner.to_string(),
            GesturepadError::InvalidConfiguration { details } => details,
            other => other.to_string(),
        };
        Self::new(status, detail)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiFailure>;

/// Body of `PUT /v1/profiles/{name}`; the name comes from the path
#[derive(Debug, Deserialize)]
pub struct ProfilePayload {
    #[serde(default = "default_payload_description")]
    pub description: String,
    #[serde(default = "crate::profile::model::default_left_bound")]
    pub left_bound: f64,
    #[serde(default = "crate::profile::model::default_right_bound")]
    pub right_bound: f64,
    #[serde(default = "crate::profile::model::default_detection_confidence")]
    pub detection_confidence: f64,
    #[serde(default = "crate::profile::model::default_presence_confidence")]
    pub presence_confidence: f64,
    #[serde(default = "crate::profile::model::default_tracking_confidence")]
    pub tracking_confidence: f64,
    #[serde(default = "crate::profile::model::default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_payload_description() -> String {
    "Custom profile".to_string()
}

impl ProfilePayload {
    fn into_profile(self, name: String) -> Profile {
        Profile {
            name,
            description: self.description,
            left_bound: self.left_bound,
            right_bound: self.right_bound,
            detection_confidence: self.detection_confidence,
            presence_confidence: self.presence_confidence,
            tracking_confidence: self.tracking_confidence,
            cooldown_ms: self.cooldown_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Any integer; the store clamps it to its history size
    pub limit: Option<i64>,
}

/// Landing page: the dashboard when one is installed, otherwise a short index
pub async fn root_handler(State(state): State<ApiState>) -> Response {
    if state.dashboard_dir.is_some() {
        return Redirect::temporary("/dashboard/").into_response();
    }

    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>Gesturepad</title></head>
<body>
    <h1>Gesturepad API</h1>
    <ul>
        <li><a href="/v1/health">/v1/health</a></li>
        <li><a href="/v1/config">/v1/config</a></li>
        <li><a href="/v1/profiles">/v1/profiles</a></li>
        <li><a href="/v1/telemetry">/v1/telemetry</a></li>
        <li><a href="/v1/telemetry/stream">/v1/telemetry/stream</a></li>
        <li><a href="/v1/overlay.jpg">/v1/overlay.jpg</a></li>
    </ul>
</body>
</html>"#,
    )
    .into_response()
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "gesturepad-api",
    }))
}

pub async fn config_handler(State(state): State<ApiState>) -> Json<Value> {
    let config = &state.config;
    let active_profile = state.profiles.active_name().await;

    Json(json!({
        "source": {
            "kind": config.source.kind,
            "mirror": config.source.mirror,
            "frame_interval_ms": config.source.frame_interval_ms,
        },
        "smoothing": config.gesture.smoothing,
        "keys": config.keys,
        "telemetry": {
            "max_history": config.telemetry.max_history,
            "publish_interval_ms": config.telemetry.publish_interval_ms,
        },
        "overlay": {
            "enabled": config.overlay.enabled,
            "width": config.overlay.width,
            "height": config.overlay.height,
        },
        "api_host": config.api.host,
        "api_port": config.api.port,
        "api_key_enabled": !config.api.api_key.is_empty(),
        "active_profile": active_profile,
    }))
}

pub async fn list_profiles_handler(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let items = state.profiles.list().await?;
    let active = state.profiles.active_name().await;
    Ok(Json(json!({
        "active": active,
        "items": items,
    })))
}

pub async fn get_profile_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.profiles.get(&name).await?))
}

pub async fn put_profile_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) =
        payload.map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, e.body_text()))?;

    crate::profile::validate_profile_name(&name)?;
    let profile = state.profiles.save(payload.into_profile(name)).await?;
    info!("Saved profile '{}' via API", profile.name);

    Ok(Json(json!({
        "status": "saved",
        "profile": profile,
    })))
}

pub async fn activate_profile_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let profile = state.profiles.activate(&name).await?;

    // nobody listens in api-only mode; the pointer file is still updated
    if let Err(e) = state
        .event_bus
        .publish(GesturepadEvent::ProfileActivated {
            name: profile.name.clone(),
        })
        .await
    {
        debug!("Profile activation not delivered: {}", e);
    }

    Ok(Json(json!({
        "status": "activated",
        "profile": profile,
    })))
}

pub async fn telemetry_handler(
    State(state): State<ApiState>,
    query: Result<Query<TelemetryQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) =
        query.map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, e.body_text()))?;
    let limit = query.limit.unwrap_or(DEFAULT_TELEMETRY_LIMIT);
    let limit = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
    Ok(Json(json!({
        "latest": state.telemetry.latest(),
        "history": state.telemetry.history(limit),
    })))
}

/// Server-sent events, one `telemetry` event per published snapshot
pub async fn telemetry_stream_handler(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    info!("New telemetry stream client connected");
    let mut receiver = state.telemetry.subscribe();
    let shutdown = state.shutdown.clone();

    // the telemetry feed outlives the server, so the stream also ends on shutdown
    let stream = async_stream::stream! {
        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = receiver.recv() => received,
            };
            match received {
                Ok(snapshot) => yield Event::default().event("telemetry").json_data(&snapshot),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Telemetry stream client lagged, skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Telemetry stream client disconnected");
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(feature = "overlay")]
pub async fn overlay_handler(State(state): State<ApiState>) -> ApiResult<Response> {
    use crate::telemetry::LiveFrame;
    use axum::http::header;
    use bytes::Bytes;

    let renderer = state
        .overlay
        .clone()
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Overlay disabled"))?;

    let frame = match state.telemetry.latest_frame() {
        Some(frame) => frame,
        None => {
            let profile = state.profiles.active().await?;
            LiveFrame::idle(&profile.name, profile.lane_bounds()?)
        }
    };

    let jpeg = tokio::task::spawn_blocking(move || renderer.render_jpeg(&frame))
        .await
        .map_err(|e| {
            ApiFailure::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Overlay render task failed: {}", e),
            )
        })??;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        ],
        Bytes::from(jpeg),
    )
        .into_response())
}

#[cfg(not(feature = "overlay"))]
pub async fn overlay_handler() -> ApiResult<Response> {
    Err(ApiFailure::new(StatusCode::NOT_FOUND, "Overlay disabled"))
}
