// src/routes.rs

use std::any::Any;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as AnyOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    config::MediaConfig,
    constants::API_PREFIX,
    error::ApiError,
    handlers::{healthcheck::healthcheck, user, video},
    state::AppState,
    utils::jwt::verify_jwt_middleware,
};

/// Largest multipart body accepted by the registration route.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// `*` allows any origin; otherwise a comma-separated list of origins with
/// credentials allowed.
fn cors_layer(cors_origin: &str) -> CorsLayer {
    if cors_origin.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin);
    }

    let origins: Vec<HeaderValue> = cors_origin
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Panics inside a handler end up here and leave as a regular 500 envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);
    ApiError::internal("Internal Server Error").into_response()
}

/// Assembles the main application router.
///
/// * Mounts the versioned API under `/api/v1`.
/// * Serves locally stored media under `/media` when that backend is active.
/// * Applies global middleware (Trace, CORS, panic capture).
pub fn create_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route(
            "/register",
            post(user::register).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/login", post(user::login))
        // Protected user routes
        .merge(
            Router::new()
                .route("/current-user", get(user::current_user))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    verify_jwt_middleware,
                )),
        );

    let api_routes = Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/videos", get(video::list_videos))
        .nest("/users", user_routes);

    let mut app = Router::new().nest(API_PREFIX, api_routes);

    if let MediaConfig::Local { dir, .. } = &state.config.media {
        app = app.nest_service("/media", ServeDir::new(dir));
    }

    let cors = cors_layer(&state.config.cors_origin);

    app
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}
