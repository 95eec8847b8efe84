use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::ApplicationSettings;

/// Builds the CORS layer from configuration. A bare `"*"` entry (the
/// default) permits any origin; anything else is matched against an
/// explicit allow-list.
pub fn layer(settings: &ApplicationSettings) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    if settings.cors_allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(tower_http::cors::Any);
    }

    let origins: Vec<_> = settings
        .cors_allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
