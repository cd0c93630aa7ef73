//! HTTP API layer for the comment service.
//!
//! - **Endpoints**: comments, reactions, reports, admin moderation and settings
//! - **Extractors**: gateway-forwarded caller identity, tenant, client metadata
//! - **Middleware**: identity and tenant resolution, rate limiting
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod response;

use axum::{Router, middleware::from_fn};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use endpoints::router;
pub use extractors::Caller;
pub use middleware::AppState;
pub use rate_limit::RateLimiterState;

/// Full application router: health checks at the root, the API under `/api/v1`.
pub fn app(state: AppState, limiter: RateLimiterState) -> Router {
    Router::new()
        .merge(endpoints::health_router())
        .nest("/api/v1", router(limiter))
        .layer(from_fn(middleware::tenant_middleware))
        .layer(from_fn(middleware::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
