//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    handler::Handler,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use comment_common::{AppError, AppResult};
use comment_core::{
    CommentPage, CommentStats, CreateCommentInput, ListCommentsInput, Pagination,
    UpdateCommentInput,
};
use comment_db::entities::comment;
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, ClientMeta, MaybeAuthUser, Tenant},
    middleware::AppState,
    rate_limit::{RateLimiterState, rate_limit_middleware},
    response::ApiResponse,
};

/// `page` / `page_size` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.page_size)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
}

/// Create a comment.
async fn create(
    AuthUser(caller): AuthUser,
    Tenant(tenant): Tenant,
    ClientMeta(client): ClientMeta,
    State(state): State<AppState>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<comment::Model>> {
    let comment = state
        .comment_service
        .create(&tenant, &caller.author(), input, client)
        .await?;
    Ok(ApiResponse::created(comment))
}

/// List comments of a resource.
async fn list(
    user: MaybeAuthUser,
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    Query(input): Query<ListCommentsInput>,
) -> AppResult<ApiResponse<CommentPage>> {
    let page = state
        .comment_service
        .list(&tenant, input, user.is_admin())
        .await?;
    Ok(ApiResponse::ok(page))
}

/// Full-text search over approved comments.
async fn search(
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<CommentPage>> {
    let page = state
        .comment_service
        .search(&tenant, &query.q, Pagination::new(query.page, query.page_size))
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn stats(
    Tenant(tenant): Tenant,
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<ApiResponse<CommentStats>> {
    let (Some(resource_type), Some(resource_id)) = (query.resource_type, query.resource_id) else {
        return Err(AppError::Validation(
            "resource_type and resource_id are required".to_string(),
        ));
    };

    let stats = state
        .comment_service
        .stats(&tenant, &resource_type, &resource_id)
        .await?;
    Ok(ApiResponse::ok(stats))
}

async fn show(
    user: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<comment::Model>> {
    let comment = state
        .comment_service
        .get(&id, user.id(), user.is_admin())
        .await?;
    Ok(ApiResponse::ok(comment))
}

/// Edit a comment.
async fn update(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCommentInput>,
) -> AppResult<ApiResponse<comment::Model>> {
    let comment = state
        .comment_service
        .update(&id, input, &caller.id, caller.is_admin())
        .await?;
    Ok(ApiResponse::ok(comment))
}

/// Soft-delete a comment.
async fn delete(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .comment_service
        .soft_delete(&id, &caller.id, caller.is_admin())
        .await?;
    Ok(ApiResponse::message("Comment deleted"))
}

async fn replies(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<CommentPage>> {
    let page = state
        .comment_service
        .get_replies(&id, query.pagination())
        .await?;
    Ok(ApiResponse::ok(page))
}

pub fn router(limiter: RateLimiterState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(create.layer(from_fn_with_state(limiter, rate_limit_middleware))).get(list),
        )
        .route("/search", get(search))
        .route("/stats", get(stats))
        .route("/{id}", get(show).put(update).delete(delete))
        .route("/{id}/replies", get(replies))
}
