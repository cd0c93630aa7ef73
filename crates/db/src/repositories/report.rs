//! Comment report repository.

use std::sync::Arc;

use async_trait::async_trait;
use comment_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, prelude::DateTimeWithTimeZone,
};

use crate::entities::{
    CommentReport,
    comment_report::{self, ReportStatus},
};
use crate::store::{Page, ReportStore};

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn insert(&self, model: comment_report::Model) -> AppResult<comment_report::Model> {
        model
            .into_active_model()
            .reset_all()
            .insert(self.db.as_ref())
            .await
            .map_err(super::db_err)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<comment_report::Model>> {
        CommentReport::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_pending(
        &self,
        offset: u64,
        limit: u64,
    ) -> AppResult<Page<comment_report::Model>> {
        let select =
            CommentReport::find().filter(comment_report::Column::Status.eq(ReportStatus::Pending));

        let total = select
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = select
            .order_by_asc(comment_report::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page { items, total })
    }

    async fn update_status(
        &self,
        id: &str,
        status: ReportStatus,
        reviewed_by: &str,
        reviewed_at: DateTimeWithTimeZone,
    ) -> AppResult<comment_report::Model> {
        let report = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("report {id}")))?;

        let mut active = report.into_active_model();
        active.status = Set(status);
        active.reviewed_by = Set(Some(reviewed_by.to_string()));
        active.reviewed_at = Set(Some(reviewed_at));

        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
