//! Reaction endpoints.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use comment_common::AppResult;
use comment_core::{MyReactionsInput, ReactionInput};
use comment_db::entities::comment_reaction::{self, ReactionType};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Serialize)]
pub struct MyReactionResponse {
    pub reaction: Option<ReactionType>,
}

/// React to a comment, replacing any previous reaction.
async fn add(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ReactionInput>,
) -> AppResult<ApiResponse<comment_reaction::Model>> {
    let reaction = state.reaction_service.add(&id, &caller.id, &input).await?;
    Ok(ApiResponse::created(reaction))
}

async fn remove(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.reaction_service.remove(&id, &caller.id).await?;
    Ok(ApiResponse::message("Reaction removed"))
}

async fn mine(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MyReactionResponse>> {
    let reaction = state.reaction_service.mine(&id, &caller.id).await?;
    Ok(ApiResponse::ok(MyReactionResponse { reaction }))
}

/// The caller's reactions on several comments.
async fn mine_batch(
    AuthUser(caller): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<MyReactionsInput>,
) -> AppResult<ApiResponse<BTreeMap<String, Option<ReactionType>>>> {
    let reactions = state.reaction_service.mine_batch(input, &caller.id).await?;
    Ok(ApiResponse::ok(reactions))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reactions/me", post(mine_batch))
        .route("/{id}/reactions", post(add).delete(remove))
        .route("/{id}/reactions/me", get(mine))
}
