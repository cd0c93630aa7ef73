//! In-memory store implementations.
//!
//! Same observable semantics as the Postgres repositories, including
//! uniqueness conflicts, plus switches to make counter updates fail.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use comment_common::{AppError, AppResult};
use sea_orm::{TryIntoModel, prelude::DateTimeWithTimeZone};

use crate::entities::{
    comment::{self, CommentStatus},
    comment_reaction::{self, ReactionType},
    comment_report::{self, ReportStatus},
    comment_settings,
};
use crate::repositories::overlay_settings;
use crate::store::{
    CommentQuery, CommentStore, Page, ParentFilter, ReactionStore, ReactionTally, ReportStore,
    SettingsStore, SortDirection, SortField, StatusCounts,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn window<T: Clone>(items: &[T], offset: u64, limit: u64) -> Vec<T> {
    items
        .iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

// ==================== Comments ====================

/// In-memory [`CommentStore`].
#[derive(Default)]
pub struct MemoryCommentStore {
    comments: Mutex<HashMap<String, comment::Model>>,
    fail_counters: AtomicBool,
}

impl MemoryCommentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every counter update fail with a database error.
    pub fn fail_counter_updates(&self, fail: bool) {
        self.fail_counters.store(fail, AtomicOrdering::SeqCst);
    }

    /// Number of stored comments, deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.comments).len()
    }

    /// Whether the store holds no comments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update_counter(&self, id: &str, apply: impl FnOnce(&mut comment::Model)) -> AppResult<()> {
        if self.fail_counters.load(AtomicOrdering::SeqCst) {
            return Err(AppError::Database("counter update failed".to_string()));
        }
        if let Some(model) = lock(&self.comments).get_mut(id) {
            apply(model);
        }
        Ok(())
    }

    fn matches(query: &CommentQuery, model: &comment::Model) -> bool {
        let eq = |filter: &Option<String>, value: &str| filter.as_deref().is_none_or(|f| f == value);

        let parent_ok = match &query.parent {
            ParentFilter::RootsOnly => model.parent_id.is_none(),
            ParentFilter::RepliesTo(parent_id) => {
                model.parent_id.as_deref() == Some(parent_id.as_str())
            }
            ParentFilter::Any => true,
        };

        eq(&query.tenant_id, &model.tenant_id)
            && eq(&query.resource_type, &model.resource_type)
            && eq(&query.resource_id, &model.resource_id)
            && eq(&query.author_id, &model.author_id)
            && parent_ok
            && query.status.is_none_or(|s| s == model.status)
            && query.is_pinned.is_none_or(|p| p == model.is_pinned)
            && (query.include_deleted || !model.is_deleted)
    }

    fn compare(query: &CommentQuery, a: &comment::Model, b: &comment::Model) -> Ordering {
        let pinned = if query.pinned_first {
            b.is_pinned.cmp(&a.is_pinned)
        } else {
            Ordering::Equal
        };
        let field = match query.sort_field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::LikeCount => a.like_count.cmp(&b.like_count),
            SortField::ReplyCount => a.reply_count.cmp(&b.reply_count),
        }
        .then_with(|| a.id.cmp(&b.id));
        let field = match query.sort_direction {
            SortDirection::Asc => field,
            SortDirection::Desc => field.reverse(),
        };
        pinned.then(field)
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Ok(lock(&self.comments).get(id).cloned())
    }

    async fn insert(&self, model: comment::Model) -> AppResult<comment::Model> {
        let mut comments = lock(&self.comments);
        if comments.contains_key(&model.id) {
            return Err(AppError::Conflict(format!("comment {} exists", model.id)));
        }
        comments.insert(model.id.clone(), model.clone());
        Ok(model)
    }

    async fn replace(&self, model: comment::Model) -> AppResult<comment::Model> {
        let mut comments = lock(&self.comments);
        match comments.get_mut(&model.id) {
            Some(stored) => {
                *stored = model.clone();
                Ok(model)
            }
            None => Err(AppError::Database(format!("comment {} vanished", model.id))),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        lock(&self.comments).remove(id);
        Ok(())
    }

    async fn increment_reply_count(&self, id: &str) -> AppResult<()> {
        self.update_counter(id, |m| m.reply_count += 1)
    }

    async fn decrement_reply_count(&self, id: &str) -> AppResult<()> {
        self.update_counter(id, |m| m.reply_count = (m.reply_count - 1).max(0))
    }

    async fn increment_report_count(&self, id: &str) -> AppResult<()> {
        self.update_counter(id, |m| m.report_count += 1)
    }

    async fn set_reaction_counts(&self, id: &str, tally: &ReactionTally) -> AppResult<()> {
        let by_type =
            serde_json::to_value(&tally.by_type).map_err(|e| AppError::Internal(e.to_string()))?;
        self.update_counter(id, |m| {
            m.like_count = tally.like_count;
            m.dislike_count = tally.dislike_count;
            m.reaction_counts = by_type;
        })
    }

    async fn find_many(&self, query: &CommentQuery) -> AppResult<Page<comment::Model>> {
        let mut matched: Vec<comment::Model> = lock(&self.comments)
            .values()
            .filter(|m| Self::matches(query, m))
            .cloned()
            .collect();
        matched.sort_by(|a, b| Self::compare(query, a, b));

        Ok(Page {
            items: window(&matched, query.offset, query.limit),
            total: matched.len() as u64,
        })
    }

    async fn count_by_status(
        &self,
        tenant_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        for model in lock(&self.comments).values() {
            if model.tenant_id == tenant_id
                && model.resource_type == resource_type
                && model.resource_id == resource_id
                && !model.is_deleted
            {
                counts.add(model.status, 1);
            }
        }
        Ok(counts)
    }

    async fn search(
        &self,
        tenant_id: &str,
        text: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Page<comment::Model>> {
        let terms: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Page {
                items: vec![],
                total: 0,
            });
        }

        let mut ranked: Vec<(usize, comment::Model)> = lock(&self.comments)
            .values()
            .filter(|m| {
                m.tenant_id == tenant_id && m.status == CommentStatus::Approved && !m.is_deleted
            })
            .filter_map(|m| {
                let document = format!("{} {}", m.content, m.author_name).to_lowercase();
                let words: Vec<&str> = document
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                    .collect();
                // every term must occur, like plainto_tsquery's AND
                let hits: Vec<usize> = terms
                    .iter()
                    .map(|t| words.iter().filter(|w| *w == t).count())
                    .collect();
                hits.iter()
                    .all(|&h| h > 0)
                    .then(|| (hits.iter().sum(), m.clone()))
            })
            .collect();
        ranked.sort_by(|(ra, a), (rb, b)| rb.cmp(ra).then_with(|| b.created_at.cmp(&a.created_at)));

        let items: Vec<comment::Model> = ranked.into_iter().map(|(_, m)| m).collect();
        Ok(Page {
            items: window(&items, offset, limit),
            total: items.len() as u64,
        })
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

// ==================== Settings ====================

/// In-memory [`SettingsStore`] keyed by (tenant, resource type).
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: Mutex<HashMap<(String, String), comment_settings::Model>>,
}

impl MemorySettingsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored settings records.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.settings).len()
    }

    /// Whether the store holds no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn find(
        &self,
        tenant_id: &str,
        resource_type: &str,
    ) -> AppResult<Option<comment_settings::Model>> {
        Ok(lock(&self.settings)
            .get(&(tenant_id.to_string(), resource_type.to_string()))
            .cloned())
    }

    async fn insert(&self, model: comment_settings::Model) -> AppResult<comment_settings::Model> {
        let key = (model.tenant_id.clone(), model.resource_type.clone());
        let mut settings = lock(&self.settings);
        if settings.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "settings for {}/{} exist",
                key.0, key.1
            )));
        }
        settings.insert(key, model.clone());
        Ok(model)
    }

    async fn upsert(
        &self,
        defaults: comment_settings::Model,
        patch: comment_settings::ActiveModel,
    ) -> AppResult<comment_settings::Model> {
        let key = (defaults.tenant_id.clone(), defaults.resource_type.clone());
        let updated_at = defaults.updated_at;
        let mut settings = lock(&self.settings);

        let base = match settings.get(&key) {
            Some(existing) => comment_settings::Model {
                updated_at,
                ..existing.clone()
            },
            None => defaults,
        };
        let (active, _) = overlay_settings(base, &patch);
        let model = active
            .try_into_model()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        settings.insert(key, model.clone());
        Ok(model)
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> AppResult<Vec<comment_settings::Model>> {
        let mut found: Vec<_> = lock(&self.settings)
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.resource_type.cmp(&b.resource_type));
        Ok(found)
    }
}

// ==================== Reactions ====================

/// In-memory [`ReactionStore`] keyed by (comment, user).
#[derive(Default)]
pub struct MemoryReactionStore {
    reactions: Mutex<HashMap<(String, String), comment_reaction::Model>>,
}

impl MemoryReactionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReactionStore for MemoryReactionStore {
    async fn upsert(
        &self,
        model: comment_reaction::Model,
    ) -> AppResult<comment_reaction::Model> {
        let key = (model.comment_id.clone(), model.user_id.clone());
        let mut reactions = lock(&self.reactions);
        let stored = match reactions.get(&key) {
            Some(existing) => comment_reaction::Model {
                reaction_type: model.reaction_type,
                updated_at: model.updated_at,
                ..existing.clone()
            },
            None => model,
        };
        reactions.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, comment_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(lock(&self.reactions)
            .remove(&(comment_id.to_string(), user_id.to_string()))
            .is_some())
    }

    async fn find(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> AppResult<Option<comment_reaction::Model>> {
        Ok(lock(&self.reactions)
            .get(&(comment_id.to_string(), user_id.to_string()))
            .cloned())
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        comment_ids: &[String],
    ) -> AppResult<Vec<comment_reaction::Model>> {
        Ok(lock(&self.reactions)
            .values()
            .filter(|r| r.user_id == user_id && comment_ids.contains(&r.comment_id))
            .cloned()
            .collect())
    }

    async fn count_by_type(&self, comment_id: &str) -> AppResult<Vec<(ReactionType, u64)>> {
        let mut counts: HashMap<ReactionType, u64> = HashMap::new();
        for reaction in lock(&self.reactions).values() {
            if reaction.comment_id == comment_id {
                *counts.entry(reaction.reaction_type).or_insert(0) += 1;
            }
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort();
        Ok(counts)
    }
}

// ==================== Reports ====================

/// In-memory [`ReportStore`].
#[derive(Default)]
pub struct MemoryReportStore {
    reports: Mutex<Vec<comment_report::Model>>,
}

impl MemoryReportStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn insert(&self, model: comment_report::Model) -> AppResult<comment_report::Model> {
        let mut reports = lock(&self.reports);
        if reports
            .iter()
            .any(|r| r.comment_id == model.comment_id && r.reporter_id == model.reporter_id)
        {
            return Err(AppError::Conflict(format!(
                "report of {} by {} exists",
                model.comment_id, model.reporter_id
            )));
        }
        reports.push(model.clone());
        Ok(model)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<comment_report::Model>> {
        Ok(lock(&self.reports).iter().find(|r| r.id == id).cloned())
    }

    async fn find_pending(
        &self,
        offset: u64,
        limit: u64,
    ) -> AppResult<Page<comment_report::Model>> {
        let mut pending: Vec<_> = lock(&self.reports)
            .iter()
            .filter(|r| r.status == ReportStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(Page {
            items: window(&pending, offset, limit),
            total: pending.len() as u64,
        })
    }

    async fn update_status(
        &self,
        id: &str,
        status: ReportStatus,
        reviewed_by: &str,
        reviewed_at: DateTimeWithTimeZone,
    ) -> AppResult<comment_report::Model> {
        let mut reports = lock(&self.reports);
        let report = reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("report {id}")))?;
        report.status = status;
        report.reviewed_by = Some(reviewed_by.to_string());
        report.reviewed_at = Some(reviewed_at);
        Ok(report.clone())
    }
}
