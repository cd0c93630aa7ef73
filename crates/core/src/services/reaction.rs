//! Reaction service and counter.

use crate::services::settings::SettingsService;
use chrono::Utc;
use comment_common::{AppError, AppResult, IdGenerator};
use comment_db::{
    CommentStoreRef, ReactionStoreRef, ReactionTally,
    entities::comment_reaction::{self, ReactionType},
};
use serde::Deserialize;
use std::collections::BTreeMap;
use validator::Validate;

/// Input for reacting to a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionInput {
    /// One of `like`, `dislike`, `love`, `haha`, `wow`, `sad` or `angry`.
    #[serde(rename = "type")]
    pub reaction_type: String,
}

/// Input for looking up the caller's reactions on several comments.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MyReactionsInput {
    #[validate(length(min = 1, max = 100))]
    pub comment_ids: Vec<String>,
}

/// Reaction service for business logic.
#[derive(Clone)]
pub struct ReactionService {
    comments: CommentStoreRef,
    reactions: ReactionStoreRef,
    settings: SettingsService,
    id_gen: IdGenerator,
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub fn new(
        comments: CommentStoreRef,
        reactions: ReactionStoreRef,
        settings: SettingsService,
    ) -> Self {
        Self {
            comments,
            reactions,
            settings,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a reaction, replacing the user's previous one on the same comment.
    pub async fn add(
        &self,
        comment_id: &str,
        user_id: &str,
        input: &ReactionInput,
    ) -> AppResult<comment_reaction::Model> {
        let reaction_type: ReactionType = input
            .reaction_type
            .parse()
            .map_err(AppError::Validation)?;
        let comment_id = IdGenerator::parse(comment_id)?;

        let comment = self
            .comments
            .find_by_id(&comment_id)
            .await?
            .ok_or_else(|| AppError::CommentNotFound(comment_id.clone()))?;
        if comment.is_deleted {
            return Err(AppError::CannotReactToDeleted);
        }

        let settings = self
            .settings
            .get_or_create(&comment.tenant_id, &comment.resource_type)
            .await?;
        if !settings.allow_reactions {
            return Err(AppError::ReactionsDisabled);
        }
        if !settings.allowed_reactions().contains(&reaction_type) {
            return Err(AppError::ReactionNotAllowed(reaction_type.as_str().to_string()));
        }

        let now = Utc::now().into();
        let reaction = self
            .reactions
            .upsert(comment_reaction::Model {
                id: self.id_gen.generate(),
                comment_id: comment_id.clone(),
                user_id: user_id.to_string(),
                reaction_type,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.refresh_counts(&comment_id).await;

        tracing::debug!(
            comment_id = %comment_id,
            user_id = %user_id,
            reaction = reaction_type.as_str(),
            "Added reaction"
        );
        Ok(reaction)
    }

    /// Remove the user's reaction, if any.
    pub async fn remove(&self, comment_id: &str, user_id: &str) -> AppResult<()> {
        let comment_id = IdGenerator::parse(comment_id)?;

        if self.reactions.delete(&comment_id, user_id).await? {
            self.refresh_counts(&comment_id).await;
            tracing::debug!(comment_id = %comment_id, user_id = %user_id, "Removed reaction");
        }
        Ok(())
    }

    /// The user's reaction on one comment.
    pub async fn mine(&self, comment_id: &str, user_id: &str) -> AppResult<Option<ReactionType>> {
        let comment_id = IdGenerator::parse(comment_id)?;
        Ok(self
            .reactions
            .find(&comment_id, user_id)
            .await?
            .map(|r| r.reaction_type))
    }

    /// The user's reactions on several comments.
    ///
    /// Every well-formed requested ID is present in the result; malformed IDs
    /// are skipped.
    pub async fn mine_batch(
        &self,
        input: MyReactionsInput,
        user_id: &str,
    ) -> AppResult<BTreeMap<String, Option<ReactionType>>> {
        input.validate()?;

        let ids: Vec<String> = input
            .comment_ids
            .iter()
            .filter_map(|id| IdGenerator::parse(id).ok())
            .collect();

        let mut result: BTreeMap<String, Option<ReactionType>> =
            ids.iter().map(|id| (id.clone(), None)).collect();
        for reaction in self.reactions.find_by_user(user_id, &ids).await? {
            result.insert(reaction.comment_id, Some(reaction.reaction_type));
        }
        Ok(result)
    }

    /// Recompute the reaction counters of a comment from its reactions.
    pub async fn recount(&self, comment_id: &str) -> AppResult<ReactionTally> {
        let counts = self.reactions.count_by_type(comment_id).await?;
        let tally = ReactionTally::from_counts(&counts);
        self.comments.set_reaction_counts(comment_id, &tally).await?;
        Ok(tally)
    }

    async fn refresh_counts(&self, comment_id: &str) {
        if let Err(e) = self.recount(comment_id).await {
            tracing::warn!(error = %e, comment_id = %comment_id, "Failed to update reaction counts");
        }
    }
}
