//! HTTP application assembly

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::core::auth::api::{MessageResponse, auth_api_router};
use crate::core::auth::{AuthService, authenticate};

/// Build the application router.
///
/// `resources` are the downstream portal routes. Each of them runs behind
/// [`authenticate`], so a [`crate::core::auth::GuardPipeline`] on them sees
/// the caller's identity. `/health` and the public auth endpoints never look
/// at the `Authorization` header.
pub fn build_router(service: AuthService, resources: Router) -> Router {
    let health = Router::new()
        .route("/health", get(health_handler))
        .with_state(service.clone());

    // route_layer panics on a router without routes
    let resources = if resources.has_routes() {
        resources.route_layer(middleware::from_fn_with_state(
            service.clone(),
            authenticate,
        ))
    } else {
        resources
    };

    resources
        .merge(health)
        .merge(auth_api_router(service))
        .layer(TraceLayer::new_for_http())
}

/// GET /health
async fn health_handler(State(service): State<AuthService>) -> Response {
    match service.health_check().await {
        Ok(()) => Json(MessageResponse::ok("ok")).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(MessageResponse::error("Service unavailable")),
            )
                .into_response()
        }
    }
}
