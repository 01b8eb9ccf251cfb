//! Cross-origin policy applied to every response.

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::{Config, CorsOrigins};

/// Builds the CORS layer from configuration.
///
/// Methods and headers are always listed explicitly, since tower-http
/// refuses wildcards once credentials are allowed.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let allow_origin = match config.cors_allowed_origins() {
        CorsOrigins::Any => AllowOrigin::from(Any),
        CorsOrigins::List(origins) => AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        ),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(config.cors_allow_credentials())
}
