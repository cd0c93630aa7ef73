//! Storage traits the services are written against.
//!
//! The Postgres repositories in [`crate::repositories`] implement these; the
//! in-memory versions in [`crate::test_utils`] back service tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use comment_common::AppResult;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entities::{
    comment::{self, CommentStatus},
    comment_reaction::{self, ReactionType},
    comment_report::{self, ReportStatus},
    comment_settings,
};

/// Which thread level a comment query covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParentFilter {
    /// Top-level comments only.
    #[default]
    RootsOnly,
    /// Direct replies to one comment.
    RepliesTo(String),
    /// Any level.
    Any,
}

/// Sortable comment fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    LikeCount,
    ReplyCount,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Filter, ordering and window of a comment query.
#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub tenant_id: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub parent: ParentFilter,
    pub status: Option<CommentStatus>,
    pub author_id: Option<String>,
    pub is_pinned: Option<bool>,
    pub include_deleted: bool,
    /// Put pinned comments ahead of the sort field.
    pub pinned_first: bool,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub offset: u64,
    pub limit: u64,
}

/// A window of results plus the total matching count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Per-status comment counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts(pub BTreeMap<&'static str, u64>);

impl StatusCounts {
    /// Count for one status, zero when absent.
    #[must_use]
    pub fn get(&self, status: CommentStatus) -> u64 {
        self.0.get(status.as_str()).copied().unwrap_or(0)
    }

    /// Sum over every status.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Add `n` to the count of `status`.
    pub fn add(&mut self, status: CommentStatus, n: u64) {
        *self.0.entry(status.as_str()).or_insert(0) += n;
    }
}

/// Reaction counts written onto a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionTally {
    pub like_count: i32,
    pub dislike_count: i32,
    pub by_type: BTreeMap<String, i32>,
}

impl ReactionTally {
    /// Build from grouped per-type counts.
    #[must_use]
    pub fn from_counts(counts: &[(ReactionType, u64)]) -> Self {
        let mut tally = Self::default();
        for &(kind, n) in counts {
            let n = i32::try_from(n).unwrap_or(i32::MAX);
            match kind {
                ReactionType::Like => tally.like_count = n,
                ReactionType::Dislike => tally.dislike_count = n,
                _ => {}
            }
            tally.by_type.insert(kind.as_str().to_string(), n);
        }
        tally
    }
}

/// Comment persistence.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>>;

    async fn insert(&self, model: comment::Model) -> AppResult<comment::Model>;

    /// Replace the stored document with `model`.
    async fn replace(&self, model: comment::Model) -> AppResult<comment::Model>;

    async fn delete(&self, id: &str) -> AppResult<()>;

    async fn increment_reply_count(&self, id: &str) -> AppResult<()>;

    /// Decrement, never below zero.
    async fn decrement_reply_count(&self, id: &str) -> AppResult<()>;

    async fn increment_report_count(&self, id: &str) -> AppResult<()>;

    /// Overwrite the like/dislike/per-type counters.
    async fn set_reaction_counts(&self, id: &str, tally: &ReactionTally) -> AppResult<()>;

    async fn find_many(&self, query: &CommentQuery) -> AppResult<Page<comment::Model>>;

    /// Non-deleted comments on one resource grouped by status.
    async fn count_by_status(
        &self,
        tenant_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<StatusCounts>;

    /// Approved, non-deleted comments of a tenant ranked by text relevance.
    async fn search(
        &self,
        tenant_id: &str,
        text: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Page<comment::Model>>;

    /// Cheap liveness probe.
    async fn ping(&self) -> AppResult<()>;
}

/// Settings persistence.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn find(
        &self,
        tenant_id: &str,
        resource_type: &str,
    ) -> AppResult<Option<comment_settings::Model>>;

    /// Insert a new record; an existing (tenant, resource type) is `AppError::Conflict`.
    async fn insert(&self, model: comment_settings::Model) -> AppResult<comment_settings::Model>;

    /// Write the `Set` fields of `patch` onto the stored record, inserting `defaults`
    /// overlaid with `patch` when there is none.
    async fn upsert(
        &self,
        defaults: comment_settings::Model,
        patch: comment_settings::ActiveModel,
    ) -> AppResult<comment_settings::Model>;

    async fn find_by_tenant(&self, tenant_id: &str) -> AppResult<Vec<comment_settings::Model>>;
}

/// Reaction persistence.
#[async_trait]
pub trait ReactionStore: Send + Sync {
    /// Insert, or change the type of the user's existing reaction.
    async fn upsert(
        &self,
        model: comment_reaction::Model,
    ) -> AppResult<comment_reaction::Model>;

    /// Returns whether a reaction was removed.
    async fn delete(&self, comment_id: &str, user_id: &str) -> AppResult<bool>;

    async fn find(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> AppResult<Option<comment_reaction::Model>>;

    async fn find_by_user(
        &self,
        user_id: &str,
        comment_ids: &[String],
    ) -> AppResult<Vec<comment_reaction::Model>>;

    async fn count_by_type(&self, comment_id: &str) -> AppResult<Vec<(ReactionType, u64)>>;
}

/// Report persistence.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert a report; a second report by the same reporter is `AppError::Conflict`.
    async fn insert(&self, model: comment_report::Model) -> AppResult<comment_report::Model>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<comment_report::Model>>;

    /// Pending reports, oldest first.
    async fn find_pending(&self, offset: u64, limit: u64)
    -> AppResult<Page<comment_report::Model>>;

    async fn update_status(
        &self,
        id: &str,
        status: ReportStatus,
        reviewed_by: &str,
        reviewed_at: DateTimeWithTimeZone,
    ) -> AppResult<comment_report::Model>;
}

pub type CommentStoreRef = Arc<dyn CommentStore>;
pub type SettingsStoreRef = Arc<dyn SettingsStore>;
pub type ReactionStoreRef = Arc<dyn ReactionStore>;
pub type ReportStoreRef = Arc<dyn ReportStore>;
