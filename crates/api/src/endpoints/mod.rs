//! API endpoints.

mod admin;
mod comments;
mod health;
mod reactions;
mod reports;

use axum::Router;

use crate::middleware::AppState;
use crate::rate_limit::RateLimiterState;

pub use health::router as health_router;

/// Create the `/api/v1` router.
pub fn router(limiter: RateLimiterState) -> Router<AppState> {
    Router::new()
        .nest(
            "/comments",
            comments::router(limiter)
                .merge(reactions::router())
                .merge(reports::router()),
        )
        .nest("/admin", admin::router())
}
