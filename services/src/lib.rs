//! HTTP service exposing CRUD operations on `usuarios` stored in MongoDB.

use crate::config::Config;
use crate::usuarios::{AppState, MessageResponse, UsuarioStorage, usuario_routes};
use axum::{
    Json, Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
};
use opentelemetry::{global, propagation::Extractor};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod config;
pub mod cors;
pub mod database;
pub mod telemetry;
pub mod usuarios;
pub mod version;

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Builds the application router around the given storage.
///
/// The storage is injected here once and shared by every request.
pub fn routes<U>(usuario_storage: U, config: Config) -> Router
where
    U: UsuarioStorage,
{
    let state = AppState::new(usuario_storage);

    Router::new()
        .route("/", get(root))
        .route("/is-health", get(health_check::<U>))
        .merge(usuario_routes::<U>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(axum::http::header::USER_AGENT),
                );

                span.set_parent(parent_context);

                span
            }),
        )
        .layer(cors::cors_layer(&config))
        .layer(Extension(config))
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(MessageResponse::new("Servidor de Usuarios en funcionamiento"))
}

async fn health_check<U>(
    State(state): State<AppState<U>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse
where
    U: UsuarioStorage,
{
    let mut response = if state.usuarios.storage().is_connected().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    let headers = response.headers_mut();
    if let Ok(env_value) = HeaderValue::from_str(&config.environment().to_string()) {
        headers.insert(HeaderName::from_static("x-service-env"), env_value);
    }
    if let Ok(version_value) = HeaderValue::from_str(&version::format_version(config.environment()))
    {
        headers.insert(HeaderName::from_static("x-service-version"), version_value);
    }

    response
}

async fn catch_all() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
