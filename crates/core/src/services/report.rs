//! Report service.

use crate::services::comment::Pagination;
use chrono::Utc;
use comment_common::{AppError, AppResult, IdGenerator};
use comment_db::{
    CommentStoreRef, ReportStoreRef,
    entities::comment_report::{self, ReportReason, ReportStatus},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Input for reporting a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    /// One of `spam`, `inappropriate`, `harassment`, `hate_speech`,
    /// `misinformation` or `other`.
    pub reason: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Input for reviewing a report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReportInput {
    /// `reviewed` or `dismissed`.
    pub status: String,
}

/// One page of reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    pub reports: Vec<comment_report::Model>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    comments: CommentStoreRef,
    reports: ReportStoreRef,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub fn new(comments: CommentStoreRef, reports: ReportStoreRef) -> Self {
        Self {
            comments,
            reports,
            id_gen: IdGenerator::new(),
        }
    }

    /// Report a comment. Each user may report a comment once.
    pub async fn create(
        &self,
        comment_id: &str,
        reporter_id: &str,
        input: CreateReportInput,
    ) -> AppResult<comment_report::Model> {
        input.validate()?;
        let reason: ReportReason = input.reason.parse().map_err(AppError::Validation)?;
        let comment_id = IdGenerator::parse(comment_id)?;

        if self.comments.find_by_id(&comment_id).await?.is_none() {
            return Err(AppError::CommentNotFound(comment_id));
        }

        let report = self
            .reports
            .insert(comment_report::Model {
                id: self.id_gen.generate(),
                comment_id: comment_id.clone(),
                reporter_id: reporter_id.to_string(),
                reason,
                description: input.description.filter(|d| !d.trim().is_empty()),
                status: ReportStatus::Pending,
                reviewed_by: None,
                reviewed_at: None,
                created_at: Utc::now().into(),
            })
            .await
            .map_err(|e| if e.is_conflict() { AppError::AlreadyReported } else { e })?;

        if let Err(e) = self.comments.increment_report_count(&comment_id).await {
            tracing::warn!(error = %e, comment_id = %comment_id, "Failed to increment report count");
        }

        tracing::info!(
            report_id = %report.id,
            comment_id = %comment_id,
            reporter_id = %reporter_id,
            "Comment reported"
        );
        Ok(report)
    }

    /// Reports awaiting review, oldest first.
    pub async fn pending(&self, pagination: Pagination) -> AppResult<ReportPage> {
        let page = self
            .reports
            .find_pending(pagination.offset(), pagination.page_size)
            .await?;

        Ok(ReportPage {
            reports: page.items,
            total: page.total,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages: pagination.total_pages(page.total),
        })
    }

    /// Close a report as reviewed or dismissed.
    pub async fn review(
        &self,
        report_id: &str,
        input: &ReviewReportInput,
        reviewer_id: &str,
    ) -> AppResult<comment_report::Model> {
        let status: ReportStatus = input.status.parse().map_err(AppError::Validation)?;
        if status == ReportStatus::Pending {
            return Err(AppError::Validation(
                "review status must be reviewed or dismissed".to_string(),
            ));
        }
        let report_id = IdGenerator::parse(report_id)?;

        let report = self
            .reports
            .update_status(&report_id, status, reviewer_id, Utc::now().into())
            .await?;

        tracing::info!(report_id = %report.id, status = %input.status, "Reviewed report");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use comment_common::ErrorKind;
    use comment_db::CommentStore;
    use comment_db::entities::comment;
    use comment_db::test_utils::{MemoryCommentStore, MemoryReportStore};
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (ReportService, Arc<MemoryCommentStore>) {
        let comments = Arc::new(MemoryCommentStore::new());
        let service = ReportService::new(comments.clone(), Arc::new(MemoryReportStore::new()));
        (service, comments)
    }

    async fn seed_comment(comments: &MemoryCommentStore) -> String {
        let now = Utc::now().into();
        let id = IdGenerator::new().generate();
        comments
            .insert(comment::Model {
                id: id.clone(),
                tenant_id: "shop".to_string(),
                resource_type: "product".to_string(),
                resource_id: "p1".to_string(),
                parent_id: None,
                root_id: None,
                depth: 0,
                author_id: "author".to_string(),
                author_name: "Author".to_string(),
                author_email: None,
                is_anonymous: false,
                content: "buy now".to_string(),
                content_html: None,
                attachments: json!([]),
                metadata: json!({}),
                status: comment::CommentStatus::Approved,
                moderated_by: None,
                moderated_at: None,
                rejection_reason: None,
                flagged_words: json!([]),
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
                ip_address: None,
                user_agent: None,
                is_deleted: false,
                deleted_at: None,
                deleted_by: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        id
    }

    fn spam_report() -> CreateReportInput {
        CreateReportInput {
            reason: "spam".to_string(),
            description: Some("link farm".to_string()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_report_is_rejected() {
        let (service, comments) = setup();
        let id = seed_comment(&comments).await;

        let first = service.create(&id, "r1", spam_report()).await.unwrap();
        assert_eq!(first.status, ReportStatus::Pending);
        assert_eq!(first.reason, ReportReason::Spam);

        let err = service.create(&id, "r1", spam_report()).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyReported));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        service.create(&id, "r2", spam_report()).await.unwrap();
        let comment = comments.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(comment.report_count, 2);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (service, comments) = setup();
        let id = seed_comment(&comments).await;

        let err = service
            .create(
                &id,
                "r1",
                CreateReportInput {
                    reason: "boring".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .create(
                &id,
                "r1",
                CreateReportInput {
                    reason: "other".to_string(),
                    description: Some("x".repeat(501)),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let missing = IdGenerator::new().generate();
        let err = service.create(&missing, "r1", spam_report()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_report_count_failure_is_swallowed() {
        let (service, comments) = setup();
        let id = seed_comment(&comments).await;
        comments.fail_counter_updates(true);

        service.create(&id, "r1", spam_report()).await.unwrap();
        assert_eq!(comments.find_by_id(&id).await.unwrap().unwrap().report_count, 0);
    }

    #[tokio::test]
    async fn test_review_flow() {
        let (service, comments) = setup();
        let id = seed_comment(&comments).await;
        let first = service.create(&id, "r1", spam_report()).await.unwrap();
        service.create(&id, "r2", spam_report()).await.unwrap();

        let queue = service.pending(Pagination::default()).await.unwrap();
        assert_eq!(queue.total, 2);
        assert_eq!(queue.reports[0].id, first.id);

        let reviewed = service
            .review(
                &first.id,
                &ReviewReportInput {
                    status: "dismissed".to_string(),
                },
                "m1",
            )
            .await
            .unwrap();
        assert_eq!(reviewed.status, ReportStatus::Dismissed);
        assert_eq!(reviewed.reviewed_by.as_deref(), Some("m1"));
        assert!(reviewed.reviewed_at.is_some());
        assert_eq!(service.pending(Pagination::default()).await.unwrap().total, 1);

        let err = service
            .review(
                &first.id,
                &ReviewReportInput {
                    status: "pending".to_string(),
                },
                "m1",
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
