//! Comment engine.

use crate::services::bad_words::BadWordDetector;
use crate::services::notification::NotificationDispatcher;
use crate::services::settings::SettingsService;
use chrono::Utc;
use comment_common::{AppError, AppResult, IdGenerator};
use comment_db::{
    CommentQuery, CommentStoreRef, Page, ParentFilter, SortDirection, SortField,
    entities::comment::{self, Attachment, CommentStatus, EditRecord},
    entities::comment_settings,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

/// Display name used for anonymous comments.
const ANONYMOUS_NAME: &str = "Anonymous";

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Identity of the user writing a comment, as resolved upstream.
#[derive(Debug, Clone, Default)]
pub struct Author {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Client details recorded with a new comment.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 64))]
    pub resource_type: String,

    #[validate(length(min = 1, max = 255))]
    pub resource_id: String,

    pub parent_id: Option<String>,

    #[validate(length(min = 1, max = 10000))]
    pub content: String,

    /// Overrides the profile name of the author.
    #[validate(length(max = 100))]
    pub author_name: Option<String>,

    #[serde(default)]
    pub is_anonymous: bool,

    #[validate(length(max = 20))]
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    pub metadata: Option<serde_json::Value>,
}

/// Input for editing a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentInput {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,

    #[validate(length(max = 20))]
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Input for a moderation decision.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ModerateCommentInput {
    /// One of `approved`, `rejected` or `spam`.
    pub status: String,

    #[validate(length(max = 500))]
    pub rejection_reason: Option<String>,
}

/// Input for moderating many comments at once.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkModerateInput {
    #[validate(length(min = 1, max = 100))]
    pub comment_ids: Vec<String>,

    pub status: String,

    #[validate(length(max = 500))]
    pub rejection_reason: Option<String>,
}

/// Filters for listing comments, read from snake_case query parameters.
/// Absent `parent_id` means top-level comments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCommentsInput {
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub parent_id: Option<String>,
    pub status: Option<String>,
    pub author_id: Option<String>,
    pub is_pinned: Option<bool>,
    #[serde(default)]
    pub include_deleted: bool,
    /// `created_at`, `like_count` or `reply_count`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Page number and size after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// Clamp a requested page: `page < 1` becomes 1, a size outside
    /// `1..=100` becomes 20.
    #[must_use]
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page
            .and_then(|p| u64::try_from(p).ok())
            .filter(|&p| p >= 1)
            .unwrap_or(1);
        let page_size = page_size
            .and_then(|s| u64::try_from(s).ok())
            .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self { page, page_size }
    }

    #[must_use]
    pub const fn offset(self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    #[must_use]
    pub const fn total_pages(self, total: u64) -> u64 {
        match self.page_size {
            0 => 0,
            size => total.div_ceil(size),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of comments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<comment::Model>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl CommentPage {
    fn new(page: Page<comment::Model>, pagination: Pagination) -> Self {
        Self {
            comments: page.items,
            total: page.total,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages: pagination.total_pages(page.total),
        }
    }
}

/// Comment counts for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentStats {
    pub total_comments: u64,
    pub approved_count: u64,
    pub pending_count: u64,
    pub rejected_count: u64,
}

/// Outcome of a bulk moderation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkModerateResult {
    pub success_count: u64,
    pub failed_count: u64,
    pub failed_ids: Vec<String>,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comments: CommentStoreRef,
    settings: SettingsService,
    detector: BadWordDetector,
    notifications: NotificationDispatcher,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(
        comments: CommentStoreRef,
        settings: SettingsService,
        detector: BadWordDetector,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            comments,
            settings,
            detector,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    async fn find(&self, id: &str) -> AppResult<comment::Model> {
        let id = IdGenerator::parse(id)?;
        self.comments
            .find_by_id(&id)
            .await?
            .ok_or(AppError::CommentNotFound(id))
    }

    fn scan(&self, content: &str, settings: &comment_settings::Model) -> Vec<String> {
        if !settings.bad_words_filter {
            return Vec::new();
        }
        self.detector.scan(content, &settings.custom_bad_words())
    }

    fn check_length(content: &str, settings: &comment_settings::Model) -> AppResult<()> {
        let max = usize::try_from(settings.max_comment_length).unwrap_or(0);
        if content.chars().count() > max {
            return Err(AppError::ContentTooLong {
                max: settings.max_comment_length,
            });
        }
        Ok(())
    }

    fn check_attachments(
        attachments: &[Attachment],
        settings: &comment_settings::Model,
    ) -> AppResult<()> {
        if attachments.is_empty() {
            return Ok(());
        }
        if !settings.allow_attachments {
            return Err(AppError::Validation(
                "attachments are not allowed".to_string(),
            ));
        }
        if attachments.len() > usize::try_from(settings.max_attachments).unwrap_or(0) {
            return Err(AppError::Validation(format!(
                "at most {} attachments are allowed",
                settings.max_attachments
            )));
        }
        Ok(())
    }

    /// Create a comment or reply.
    pub async fn create(
        &self,
        tenant_id: &str,
        author: &Author,
        input: CreateCommentInput,
        client: ClientInfo,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        let settings = self
            .settings
            .get_or_create(tenant_id, &input.resource_type)
            .await?;

        if !settings.comments_enabled {
            return Err(AppError::CommentsDisabled);
        }
        if input.is_anonymous && !settings.allow_anonymous {
            return Err(AppError::AnonymousNotAllowed);
        }
        Self::check_length(&input.content, &settings)?;
        Self::check_attachments(&input.attachments, &settings)?;

        let mut parent_id = None;
        let mut root_id = None;
        let mut depth = 0;
        if let Some(raw_parent_id) = input.parent_id.as_deref().filter(|p| !p.is_empty()) {
            let id = IdGenerator::parse(raw_parent_id)?;
            let parent = self
                .comments
                .find_by_id(&id)
                .await?
                .filter(|p| {
                    p.tenant_id == tenant_id
                        && p.resource_type == input.resource_type
                        && p.resource_id == input.resource_id
                })
                .ok_or_else(|| AppError::ParentNotFound(id.clone()))?;

            if !settings.allow_replies {
                return Err(AppError::RepliesNotAllowed);
            }

            depth = parent.depth + 1;
            if depth > settings.max_reply_depth {
                return Err(AppError::MaxDepthExceeded {
                    max: settings.max_reply_depth,
                });
            }

            root_id = Some(parent.thread_id().to_string());
            parent_id = Some(parent.id);
        }

        let flagged_words = self.scan(&input.content, &settings);
        let status = if !settings.require_approval && flagged_words.is_empty() {
            CommentStatus::Approved
        } else {
            CommentStatus::Pending
        };

        let (author_name, author_email) = if input.is_anonymous {
            (ANONYMOUS_NAME.to_string(), None)
        } else {
            let name = input
                .author_name
                .filter(|n| !n.trim().is_empty())
                .or_else(|| author.name.clone())
                .unwrap_or_else(|| author.id.clone());
            (name, author.email.clone())
        };

        let now = Utc::now().into();
        let model = comment::Model {
            id: self.id_gen.generate(),
            tenant_id: tenant_id.to_string(),
            resource_type: input.resource_type,
            resource_id: input.resource_id,
            parent_id,
            root_id,
            depth,
            author_id: author.id.clone(),
            author_name,
            author_email,
            is_anonymous: input.is_anonymous,
            content: input.content,
            content_html: None,
            attachments: json!(input.attachments),
            metadata: input.metadata.unwrap_or_else(|| json!({})),
            status,
            moderated_by: None,
            moderated_at: None,
            rejection_reason: None,
            flagged_words: json!(flagged_words),
            report_count: 0,
            is_pinned: false,
            pinned_by: None,
            pinned_at: None,
            is_edited: false,
            edit_history: json!([]),
            reply_count: 0,
            like_count: 0,
            dislike_count: 0,
            reaction_counts: json!({}),
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        };

        let comment = self.comments.insert(model).await?;

        if !flagged_words.is_empty() {
            tracing::info!(
                comment_id = %comment.id,
                flagged = ?flagged_words,
                "Comment held for moderation"
            );
        }

        if let Some(parent_id) = &comment.parent_id {
            if let Err(e) = self.comments.increment_reply_count(parent_id).await {
                tracing::warn!(error = %e, parent_id = %parent_id, "Failed to increment reply count");
            }
        }

        self.notifications.comment_created(&comment, &settings);

        tracing::info!(
            comment_id = %comment.id,
            tenant_id = %comment.tenant_id,
            status = %comment.status,
            depth = comment.depth,
            "Created comment"
        );
        Ok(comment)
    }

    /// Get a comment visible to the caller.
    ///
    /// Non-admins other than the author only see approved, non-deleted comments;
    /// anything else is reported as not found.
    pub async fn get(
        &self,
        id: &str,
        viewer_id: Option<&str>,
        is_admin: bool,
    ) -> AppResult<comment::Model> {
        let comment = self.find(id).await?;

        let is_author = viewer_id.is_some_and(|v| v == comment.author_id);
        let public = comment.status == CommentStatus::Approved && !comment.is_deleted;
        if !(is_admin || is_author || public) {
            return Err(AppError::CommentNotFound(comment.id));
        }
        Ok(comment)
    }

    /// Edit a comment's content, keeping the prior content in its history.
    pub async fn update(
        &self,
        id: &str,
        input: UpdateCommentInput,
        caller_id: &str,
        is_admin: bool,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        let mut comment = self.find(id).await?;

        if comment.author_id != caller_id && !is_admin {
            return Err(AppError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }
        if comment.is_deleted {
            return Err(AppError::CannotEditDeleted);
        }

        let settings = self
            .settings
            .get_or_create(&comment.tenant_id, &comment.resource_type)
            .await?;
        Self::check_length(&input.content, &settings)?;
        Self::check_attachments(&input.attachments, &settings)?;

        let now = Utc::now().into();
        let mut history = comment.edit_history();
        history.push(EditRecord {
            content: std::mem::take(&mut comment.content),
            edited_at: now,
            edited_by: caller_id.to_string(),
        });

        let flagged_words = self.scan(&input.content, &settings);
        if !flagged_words.is_empty() && settings.require_approval {
            comment.status = CommentStatus::Pending;
        }

        comment.content = input.content;
        comment.content_html = None;
        comment.attachments = json!(input.attachments);
        comment.flagged_words = json!(flagged_words);
        comment.edit_history = json!(history);
        comment.is_edited = true;
        comment.updated_at = now;

        let comment = self.comments.replace(comment).await?;

        tracing::info!(
            comment_id = %comment.id,
            edits = history.len(),
            status = %comment.status,
            "Edited comment"
        );
        Ok(comment)
    }

    /// Soft-delete a comment.
    pub async fn soft_delete(&self, id: &str, caller_id: &str, is_admin: bool) -> AppResult<()> {
        let mut comment = self.find(id).await?;

        if comment.author_id != caller_id && !is_admin {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }
        if comment.is_deleted {
            return Ok(());
        }

        let now = Utc::now().into();
        comment.is_deleted = true;
        comment.deleted_at = Some(now);
        comment.deleted_by = Some(caller_id.to_string());
        comment.updated_at = now;

        let comment = self.comments.replace(comment).await?;

        if let Some(parent_id) = &comment.parent_id {
            if let Err(e) = self.comments.decrement_reply_count(parent_id).await {
                tracing::warn!(error = %e, parent_id = %parent_id, "Failed to decrement reply count");
            }
        }

        tracing::info!(comment_id = %comment.id, deleted_by = %caller_id, "Deleted comment");
        Ok(())
    }

    /// Remove a comment permanently.
    pub async fn hard_delete(&self, id: &str) -> AppResult<()> {
        let comment = self.find(id).await?;

        self.comments.delete(&comment.id).await?;

        if let Some(parent_id) = comment.parent_id.as_deref().filter(|_| !comment.is_deleted) {
            if let Err(e) = self.comments.decrement_reply_count(parent_id).await {
                tracing::warn!(error = %e, parent_id = %parent_id, "Failed to decrement reply count");
            }
        }

        tracing::info!(comment_id = %comment.id, "Permanently deleted comment");
        Ok(())
    }

    fn parse_decision(status: &str) -> AppResult<CommentStatus> {
        let status = status.parse::<CommentStatus>().map_err(AppError::Validation)?;
        if status == CommentStatus::Pending {
            return Err(AppError::Validation(
                "moderation status must be approved, rejected or spam".to_string(),
            ));
        }
        Ok(status)
    }

    async fn apply_decision(
        &self,
        id: &str,
        status: CommentStatus,
        rejection_reason: Option<&str>,
        moderator_id: &str,
    ) -> AppResult<comment::Model> {
        let mut comment = self.find(id).await?;

        let now = Utc::now().into();
        comment.status = status;
        comment.moderated_by = Some(moderator_id.to_string());
        comment.moderated_at = Some(now);
        comment.rejection_reason = if status == CommentStatus::Rejected {
            rejection_reason.map(ToString::to_string)
        } else {
            None
        };
        comment.updated_at = now;

        let comment = self.comments.replace(comment).await?;

        self.notifications.comment_moderated(&comment);

        tracing::info!(
            comment_id = %comment.id,
            status = %comment.status,
            moderator_id = %moderator_id,
            "Moderated comment"
        );
        Ok(comment)
    }

    /// Approve, reject or mark a comment as spam.
    pub async fn moderate(
        &self,
        id: &str,
        input: ModerateCommentInput,
        moderator_id: &str,
    ) -> AppResult<comment::Model> {
        input.validate()?;
        let status = Self::parse_decision(&input.status)?;
        self.apply_decision(id, status, input.rejection_reason.as_deref(), moderator_id)
            .await
    }

    /// Moderate each comment independently, counting failures.
    pub async fn bulk_moderate(
        &self,
        input: BulkModerateInput,
        moderator_id: &str,
    ) -> AppResult<BulkModerateResult> {
        input.validate()?;
        let status = Self::parse_decision(&input.status)?;

        let mut result = BulkModerateResult::default();
        for id in &input.comment_ids {
            match self
                .apply_decision(id, status, input.rejection_reason.as_deref(), moderator_id)
                .await
            {
                Ok(_) => result.success_count += 1,
                Err(e) => {
                    tracing::debug!(error = %e, comment_id = %id, "Bulk moderation skipped comment");
                    result.failed_count += 1;
                    result.failed_ids.push(id.clone());
                }
            }
        }

        tracing::info!(
            succeeded = result.success_count,
            failed = result.failed_count,
            status = %status,
            "Bulk moderated comments"
        );
        Ok(result)
    }

    /// Pin or unpin a comment.
    pub async fn pin(&self, id: &str, is_pinned: bool, caller_id: &str) -> AppResult<comment::Model> {
        let mut comment = self.find(id).await?;

        let now = Utc::now().into();
        comment.is_pinned = is_pinned;
        if is_pinned {
            comment.pinned_by = Some(caller_id.to_string());
            comment.pinned_at = Some(now);
        } else {
            comment.pinned_by = None;
            comment.pinned_at = None;
        }
        comment.updated_at = now;

        let comment = self.comments.replace(comment).await?;
        tracing::info!(comment_id = %comment.id, is_pinned, "Updated pin state");
        Ok(comment)
    }

    /// List comments of a tenant.
    ///
    /// Non-admins without a status filter only see approved comments, and
    /// never see deleted ones.
    pub async fn list(
        &self,
        tenant_id: &str,
        input: ListCommentsInput,
        is_admin: bool,
    ) -> AppResult<CommentPage> {
        let pagination = Pagination::new(input.page, input.page_size);

        let status = match input.status.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<CommentStatus>().map_err(AppError::Validation)?),
            None if is_admin => None,
            None => Some(CommentStatus::Approved),
        };

        let parent = match input.parent_id.as_deref().filter(|p| !p.is_empty()) {
            Some(p) => ParentFilter::RepliesTo(IdGenerator::parse(p)?),
            None => ParentFilter::RootsOnly,
        };

        let sort_field = match input.sort_by.as_deref() {
            Some("like_count" | "likeCount") => SortField::LikeCount,
            Some("reply_count" | "replyCount") => SortField::ReplyCount,
            _ => SortField::CreatedAt,
        };
        let sort_direction = match input.sort_order.as_deref() {
            Some(o) if o.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        };

        let query = CommentQuery {
            tenant_id: Some(tenant_id.to_string()),
            resource_type: input.resource_type,
            resource_id: input.resource_id,
            parent,
            status,
            author_id: input.author_id,
            is_pinned: input.is_pinned,
            include_deleted: is_admin && input.include_deleted,
            pinned_first: true,
            sort_field,
            sort_direction,
            offset: pagination.offset(),
            limit: pagination.page_size,
        };

        let page = self.comments.find_many(&query).await?;
        tracing::debug!(tenant_id = %tenant_id, total = page.total, "Listed comments");
        Ok(CommentPage::new(page, pagination))
    }

    /// Approved, non-deleted replies of a comment in reading order.
    pub async fn get_replies(&self, parent_id: &str, pagination: Pagination) -> AppResult<CommentPage> {
        let parent_id = IdGenerator::parse(parent_id)?;

        let query = CommentQuery {
            parent: ParentFilter::RepliesTo(parent_id),
            status: Some(CommentStatus::Approved),
            sort_direction: SortDirection::Asc,
            offset: pagination.offset(),
            limit: pagination.page_size,
            ..CommentQuery::default()
        };

        let page = self.comments.find_many(&query).await?;
        Ok(CommentPage::new(page, pagination))
    }

    /// The moderation queue, oldest first.
    pub async fn get_pending(
        &self,
        tenant_id: Option<&str>,
        pagination: Pagination,
    ) -> AppResult<CommentPage> {
        let query = CommentQuery {
            tenant_id: tenant_id.map(ToString::to_string),
            parent: ParentFilter::Any,
            status: Some(CommentStatus::Pending),
            sort_direction: SortDirection::Asc,
            offset: pagination.offset(),
            limit: pagination.page_size,
            ..CommentQuery::default()
        };

        let page = self.comments.find_many(&query).await?;
        Ok(CommentPage::new(page, pagination))
    }

    /// Counts of non-deleted comments on one resource.
    pub async fn stats(
        &self,
        tenant_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<CommentStats> {
        let counts = self
            .comments
            .count_by_status(tenant_id, resource_type, resource_id)
            .await?;

        Ok(CommentStats {
            total_comments: counts.total(),
            approved_count: counts.get(CommentStatus::Approved),
            pending_count: counts.get(CommentStatus::Pending),
            rejected_count: counts.get(CommentStatus::Rejected),
        })
    }

    /// Check that the comment store is reachable.
    pub async fn ping(&self) -> AppResult<()> {
        self.comments.ping().await
    }

    /// Full-text search over a tenant's approved comments.
    pub async fn search(
        &self,
        tenant_id: &str,
        text: &str,
        pagination: Pagination,
    ) -> AppResult<CommentPage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("search query is required".to_string()));
        }

        let page = self
            .comments
            .search(tenant_id, text, pagination.offset(), pagination.page_size)
            .await?;
        Ok(CommentPage::new(page, pagination))
    }
}
