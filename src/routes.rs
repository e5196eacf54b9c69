// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{comments, pageview},
    state::AppState,
    utils::origin::origin_guard,
};

/// Assembles the main application router.
///
/// * `/api/comments` sits behind the origin guard and only grants CORS to
///   configured origins.
/// * `/api/pageview` is open to any origin.
/// * Applies global middleware (Trace).
/// * Injects global state (Database Pool, Config, Throttle).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let comment_cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .vary([header::ORIGIN]);

    let pageview_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let comment_routes = Router::new()
        .route(
            "/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), origin_guard))
        .layer(comment_cors);

    let pageview_routes = Router::new()
        .route(
            "/pageview",
            get(pageview::get_views).post(pageview::record_view),
        )
        .layer(pageview_cors);

    Router::new()
        .nest("/api", comment_routes.merge(pageview_routes))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
