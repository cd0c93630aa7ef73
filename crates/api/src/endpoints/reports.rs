//! Report endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use comment_common::AppResult;
use comment_core::CreateReportInput;
use comment_db::entities::comment_report;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Report a comment.
async fn create(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateReportInput>,
) -> AppResult<ApiResponse<comment_report::Model>> {
    let report = state.report_service.create(&id, &caller.id, input).await?;
    Ok(ApiResponse::created(report))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/report", post(create))
}
