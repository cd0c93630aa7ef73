//! Admin endpoints.
//!
//! Every handler requires a caller with the `admin` or `comments:moderate` scope.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use comment_common::AppResult;
use comment_core::{
    BulkModerateInput, BulkModerateResult, CommentPage, ModerateCommentInput, ReportPage,
    ReviewReportInput, UpdateSettingsInput,
};
use comment_db::entities::{comment, comment_report, comment_settings};
use serde::Deserialize;

use super::comments::PageQuery;
use crate::{
    extractors::{AdminUser, Tenant},
    middleware::AppState,
    response::ApiResponse,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRequest {
    pub is_pinned: bool,
}

/// Moderation queue of the tenant.
async fn pending_comments(
    AdminUser(_admin): AdminUser,
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<CommentPage>> {
    let page = state
        .comment_service
        .get_pending(Some(tenant.as_str()), query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn moderate(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ModerateCommentInput>,
) -> AppResult<ApiResponse<comment::Model>> {
    let comment = state
        .comment_service
        .moderate(&id, input, &admin.id)
        .await?;
    Ok(ApiResponse::ok(comment))
}

async fn pin(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PinRequest>,
) -> AppResult<ApiResponse<comment::Model>> {
    let comment = state
        .comment_service
        .pin(&id, req.is_pinned, &admin.id)
        .await?;
    Ok(ApiResponse::ok(comment))
}

/// Permanently remove a comment.
async fn hard_delete(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.comment_service.hard_delete(&id).await?;
    Ok(ApiResponse::message("Comment permanently deleted"))
}

async fn bulk_moderate(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(input): Json<BulkModerateInput>,
) -> AppResult<ApiResponse<BulkModerateResult>> {
    let result = state
        .comment_service
        .bulk_moderate(input, &admin.id)
        .await?;
    Ok(ApiResponse::ok(result))
}

async fn pending_reports(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<ReportPage>> {
    let page = state.report_service.pending(query.pagination()).await?;
    Ok(ApiResponse::ok(page))
}

async fn review_report(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ReviewReportInput>,
) -> AppResult<ApiResponse<comment_report::Model>> {
    let report = state
        .report_service
        .review(&id, &input, &admin.id)
        .await?;
    Ok(ApiResponse::ok(report))
}

async fn list_settings(
    AdminUser(_admin): AdminUser,
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<comment_settings::Model>>> {
    let settings = state.settings_service.list_for_tenant(&tenant).await?;
    Ok(ApiResponse::ok(settings))
}

/// Effective settings for a resource type, created with defaults on first read.
async fn get_settings(
    AdminUser(_admin): AdminUser,
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
) -> AppResult<ApiResponse<comment_settings::Model>> {
    let settings = state
        .settings_service
        .get_or_create(&tenant, &resource_type)
        .await?;
    Ok(ApiResponse::ok(settings))
}

async fn update_settings(
    AdminUser(admin): AdminUser,
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    Json(input): Json<UpdateSettingsInput>,
) -> AppResult<ApiResponse<comment_settings::Model>> {
    let settings = state
        .settings_service
        .update(&tenant, &resource_type, input)
        .await?;
    tracing::info!(
        tenant_id = %tenant,
        resource_type = %resource_type,
        admin_id = %admin.id,
        "Updated comment settings"
    );
    Ok(ApiResponse::ok(settings))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments/pending", get(pending_comments))
        .route("/comments/bulk-moderate", post(bulk_moderate))
        .route("/comments/{id}", delete(hard_delete))
        .route("/comments/{id}/moderate", post(moderate))
        .route("/comments/{id}/pin", post(pin))
        .route("/reports/pending", get(pending_reports))
        .route("/reports/{id}/review", post(review_report))
        .route("/settings", get(list_settings))
        .route("/settings/{resource_type}", get(get_settings).put(update_settings))
}
