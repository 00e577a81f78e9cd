use crate::{
    config::GesturepadConfig,
    error::{ApiError, GesturepadError, Result},
    events::EventBus,
    profile::ProfileStore,
    telemetry::TelemetryStore,
};
use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

#[cfg(feature = "overlay")]
use crate::overlay::OverlayRenderer;

use super::auth::require_api_key;
use super::handlers::{
    activate_profile_handler, config_handler, get_profile_handler, health_handler,
    list_profiles_handler, overlay_handler, put_profile_handler, root_handler,
    telemetry_handler, telemetry_stream_handler,
};

/// Shared state for the Axum handlers
#[derive(Clone)]
pub struct ApiState {
    pub(crate) config: Arc<GesturepadConfig>,
    pub(crate) profiles: ProfileStore,
    pub(crate) telemetry: Arc<TelemetryStore>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) dashboard_dir: Option<PathBuf>,
    #[cfg(feature = "overlay")]
    pub(crate) overlay: Option<Arc<OverlayRenderer>>,
    /// Cancelled when the server shuts down; ends long-lived responses
    pub(crate) shutdown: CancellationToken,
}

/// HTTP API over profiles, telemetry and the debug overlay
pub struct ApiServer {
    state: ApiState,
}

impl ApiServer {
    pub fn new(state: ApiState) -> Self {
        Self { state }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.state.config.api.host, self.state.config.api.port)
    }

    pub fn router(&self) -> Router {
        routes(self.state.clone())
    }

    /// Serve until `shutdown` is cancelled. Open telemetry streams are closed
    /// by the same token so graceful shutdown does not wait on them.
    pub async fn start(&self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.address();
        info!("Starting API server on {}", addr);

        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| ApiError::BindFailed {
                    address: addr.clone(),
                    source: e,
                })?;

        info!("API server listening on {}", addr);

        let app = routes(ApiState {
            shutdown: shutdown.clone(),
            ..self.state.clone()
        });
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ApiError::ServerFailed {
                details: format!("Server error: {}", e),
            })?;

        info!("API server stopped");
        Ok(())
    }
}

fn routes(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/v1/config", get(config_handler))
        .route("/v1/profiles", get(list_profiles_handler))
        .route(
            "/v1/profiles/:name",
            get(get_profile_handler).put(put_profile_handler),
        )
        .route("/v1/profiles/:name/activate", post(activate_profile_handler))
        .route("/v1/telemetry", get(telemetry_handler))
        .route("/v1/telemetry/stream", get(telemetry_stream_handler))
        .route("/v1/overlay.jpg", get(overlay_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/v1/health", get(health_handler))
        .merge(protected);

    if let Some(dir) = &state.dashboard_dir {
        app = app.nest_service("/dashboard", ServeDir::new(dir));
    }

    app.layer(cors_layer(&state.config.api.allow_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

pub struct ApiServerBuilder {
    config: Option<Arc<GesturepadConfig>>,
    profiles: Option<ProfileStore>,
    telemetry: Option<Arc<TelemetryStore>>,
    event_bus: Option<Arc<EventBus>>,
    shutdown: CancellationToken,
}

impl ApiServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            profiles: None,
            telemetry: None,
            event_bus: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(mut self, config: Arc<GesturepadConfig>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn profiles(mut self, profiles: ProfileStore) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<TelemetryStore>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Token that ends telemetry streams served through `router()`
    pub fn shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn build(self) -> Result<ApiServer> {
        let config = self.config.ok_or_else(|| missing("API configuration"))?;
        let profiles = self.profiles.ok_or_else(|| missing("Profile store"))?;
        let telemetry = self.telemetry.ok_or_else(|| missing("Telemetry store"))?;
        let event_bus = self.event_bus.ok_or_else(|| missing("Event bus"))?;

        let dashboard_dir = PathBuf::from(&config.api.dashboard_dir);
        let dashboard_dir = dashboard_dir.is_dir().then_some(dashboard_dir);

        #[cfg(feature = "overlay")]
        let overlay = config
            .overlay
            .enabled
            .then(|| Arc::new(OverlayRenderer::new(&config.overlay)));

        Ok(ApiServer::new(ApiState {
            config,
            profiles,
            telemetry,
            event_bus,
            dashboard_dir,
            #[cfg(feature = "overlay")]
            overlay,
            shutdown: self.shutdown,
        }))
    }
}

impl Default for ApiServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(what: &str) -> GesturepadError {
    GesturepadError::Api(ApiError::ServerFailed {
        details: format!("{} is required", what),
    })
}
