//! Comment repository.

use std::sync::Arc;

use async_trait::async_trait;
use comment_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, FromQueryResult, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Statement, sea_query::Expr,
};

use crate::entities::{
    Comment,
    comment::{self, CommentStatus},
};
use crate::store::{
    CommentQuery, CommentStore, Page, ParentFilter, ReactionTally, SortDirection, SortField,
    StatusCounts,
};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, FromQueryResult)]
struct StatusCountRow {
    status: CommentStatus,
    count: i64,
}

/// `LIMIT`/`OFFSET` parameter; Postgres takes a signed bigint.
fn sql_bound(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn condition(query: &CommentQuery) -> Condition {
        let mut condition = Condition::all();

        if let Some(tenant_id) = &query.tenant_id {
            condition = condition.add(comment::Column::TenantId.eq(tenant_id.as_str()));
        }
        if let Some(resource_type) = &query.resource_type {
            condition = condition.add(comment::Column::ResourceType.eq(resource_type.as_str()));
        }
        if let Some(resource_id) = &query.resource_id {
            condition = condition.add(comment::Column::ResourceId.eq(resource_id.as_str()));
        }
        condition = match &query.parent {
            ParentFilter::RootsOnly => condition.add(comment::Column::ParentId.is_null()),
            ParentFilter::RepliesTo(parent_id) => {
                condition.add(comment::Column::ParentId.eq(parent_id.as_str()))
            }
            ParentFilter::Any => condition,
        };
        if let Some(status) = query.status {
            condition = condition.add(comment::Column::Status.eq(status));
        }
        if let Some(author_id) = &query.author_id {
            condition = condition.add(comment::Column::AuthorId.eq(author_id.as_str()));
        }
        if let Some(is_pinned) = query.is_pinned {
            condition = condition.add(comment::Column::IsPinned.eq(is_pinned));
        }
        if !query.include_deleted {
            condition = condition.add(comment::Column::IsDeleted.eq(false));
        }

        condition
    }

    /// Full-text search using `PostgreSQL` tsvector/tsquery over content and author name.
    pub async fn search_fulltext(
        &self,
        tenant_id: &str,
        text: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Page<comment::Model>> {
        const DOCUMENT: &str = "to_tsvector('simple', content || ' ' || author_name)";
        const FILTER: &str = "tenant_id = $1 AND status = 'approved' AND is_deleted = false";

        let sql = format!(
            r"
            SELECT *
            FROM comment
            WHERE {FILTER}
                AND {DOCUMENT} @@ plainto_tsquery('simple', $2)
            ORDER BY
                ts_rank({DOCUMENT}, plainto_tsquery('simple', $2)) DESC,
                created_at DESC
            LIMIT $3 OFFSET $4
            "
        );

        let items = Comment::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &sql,
                [
                    tenant_id.into(),
                    text.into(),
                    sql_bound(limit).into(),
                    sql_bound(offset).into(),
                ],
            ))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count_sql = format!(
            "SELECT COUNT(*) AS count FROM comment WHERE {FILTER} AND {DOCUMENT} @@ plainto_tsquery('simple', $2)"
        );
        let total = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &count_sql,
                [tenant_id.into(), text.into()],
            ))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .map(|row| row.try_get::<i64>("", "count"))
            .transpose()
            .map_err(|e| AppError::Database(e.to_string()))?
            .unwrap_or(0);

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    /// Fallback LIKE-based search for when full-text search is unavailable.
    pub async fn search_like(
        &self,
        tenant_id: &str,
        text: &str,
        offset: u64,
        limit: u64,
    ) -> AppResult<Page<comment::Model>> {
        let pattern = format!("%{}%", text.replace('%', "\\%").replace('_', "\\_"));

        let select = Comment::find().filter(
            Condition::all()
                .add(comment::Column::TenantId.eq(tenant_id))
                .add(comment::Column::Status.eq(CommentStatus::Approved))
                .add(comment::Column::IsDeleted.eq(false))
                .add(
                    Condition::any()
                        .add(comment::Column::Content.like(&pattern))
                        .add(comment::Column::AuthorName.like(&pattern)),
                ),
        );

        let total = select
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = select
            .order_by_desc(comment::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page { items, total })
    }
}

#[async_trait]
impl CommentStore for CommentRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert(&self, model: comment::Model) -> AppResult<comment::Model> {
        model
            .into_active_model()
            .reset_all()
            .insert(self.db.as_ref())
            .await
            .map_err(super::db_err)
    }

    async fn replace(&self, model: comment::Model) -> AppResult<comment::Model> {
        model
            .into_active_model()
            .reset_all()
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        Comment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn increment_reply_count(&self, id: &str) -> AppResult<()> {
        Comment::update_many()
            .col_expr(
                comment::Column::ReplyCount,
                Expr::col(comment::Column::ReplyCount).add(1),
            )
            .filter(comment::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn decrement_reply_count(&self, id: &str) -> AppResult<()> {
        Comment::update_many()
            .col_expr(
                comment::Column::ReplyCount,
                Expr::cust("GREATEST(reply_count - 1, 0)"),
            )
            .filter(comment::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn increment_report_count(&self, id: &str) -> AppResult<()> {
        Comment::update_many()
            .col_expr(
                comment::Column::ReportCount,
                Expr::col(comment::Column::ReportCount).add(1),
            )
            .filter(comment::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn set_reaction_counts(&self, id: &str, tally: &ReactionTally) -> AppResult<()> {
        let by_type =
            serde_json::to_value(&tally.by_type).map_err(|e| AppError::Internal(e.to_string()))?;

        Comment::update_many()
            .col_expr(comment::Column::LikeCount, Expr::value(tally.like_count))
            .col_expr(comment::Column::DislikeCount, Expr::value(tally.dislike_count))
            .col_expr(comment::Column::ReactionCounts, Expr::value(by_type))
            .filter(comment::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_many(&self, query: &CommentQuery) -> AppResult<Page<comment::Model>> {
        let select = Comment::find().filter(Self::condition(query));

        let total = select
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut select = select;
        if query.pinned_first {
            select = select.order_by_desc(comment::Column::IsPinned);
        }
        let column = match query.sort_field {
            SortField::CreatedAt => comment::Column::CreatedAt,
            SortField::LikeCount => comment::Column::LikeCount,
            SortField::ReplyCount => comment::Column::ReplyCount,
        };
        select = match query.sort_direction {
            SortDirection::Asc => select
                .order_by_asc(column)
                .order_by_asc(comment::Column::Id),
            SortDirection::Desc => select
                .order_by_desc(column)
                .order_by_desc(comment::Column::Id),
        };

        let items = select
            .offset(query.offset)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page { items, total })
    }

    async fn count_by_status(
        &self,
        tenant_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<StatusCounts> {
        let rows = Comment::find()
            .select_only()
            .column(comment::Column::Status)
            .column_as(Expr::col(comment::Column::Id).count(), "count")
            .filter(comment::Column::TenantId.eq(tenant_id))
            .filter(comment::Column::ResourceType.eq(resource_type))
            .filter(comment::Column::ResourceId.eq(resource_id))
            .filter(comment::Column::IsDeleted.eq(false))
            .group_by(comment::Column::Status)
            .into_model::<StatusCountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut counts = StatusCounts::default();
        for row in rows {
            counts.add(row.status, u64::try_from(row.count).unwrap_or(0));
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
        match self.search_fulltext(tenant_id, text, offset, limit).await {
            Ok(page) => Ok(page),
            Err(e) => {
                tracing::warn!(error = %e, "Full-text search failed, falling back to LIKE");
                self.search_like(tenant_id, text, offset, limit).await
            }
        }
    }

    async fn ping(&self) -> AppResult<()> {
        self.db
            .ping()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn create_test_comment(id: &str, parent_id: Option<&str>) -> comment::Model {
        let now = Utc::now().into();
        comment::Model {
            id: id.to_string(),
            tenant_id: "shop".to_string(),
            resource_type: "product".to_string(),
            resource_id: "p1".to_string(),
            parent_id: parent_id.map(ToString::to_string),
            root_id: parent_id.map(ToString::to_string),
            depth: i32::from(parent_id.is_some()),
            author_id: "u1".to_string(),
            author_name: "Alice".to_string(),
            author_email: None,
            is_anonymous: false,
            content: "Great product!".to_string(),
            content_html: None,
            attachments: json!([]),
            metadata: json!({}),
            status: CommentStatus::Approved,
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
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let comment = create_test_comment("c1", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[comment.clone()]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_by_id("c1").await.unwrap();

        assert_eq!(result, Some(comment));
    }

    #[tokio::test]
    async fn test_find_by_id_missing_returns_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let result = repo.find_by_id("missing").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_many_returns_items_and_total() {
        let c1 = create_test_comment("c1", None);
        let c2 = create_test_comment("c2", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2)),
                }]])
                .append_query_results([[c1, c2]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let page = repo
            .find_many(&CommentQuery {
                tenant_id: Some("shop".to_string()),
                pinned_first: true,
                limit: 20,
                ..CommentQuery::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn test_search_fulltext_clamps_huge_offset() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<comment::Model>::new()])
                .append_query_results([[maplit::btreemap! {
                    "count" => sea_orm::Value::BigInt(Some(0)),
                }]])
                .into_connection(),
        );

        let repo = CommentRepository::new(Arc::clone(&db));
        let page = repo
            .search_fulltext("shop", "great", u64::MAX, 20)
            .await
            .unwrap();
        drop(repo);

        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());

        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        let first = format!("{:?}", log[0]);
        assert!(first.contains(&format!("BigInt(Some({}))", i64::MAX)));
        assert!(first.contains("BigInt(Some(20))"));
    }

    #[tokio::test]
    async fn test_count_by_status_groups_rows() {
        let rows: Vec<BTreeMap<&str, sea_orm::Value>> = vec![
            maplit::btreemap! {
                "status" => sea_orm::Value::String(Some(Box::new("approved".to_string()))),
                "count" => sea_orm::Value::BigInt(Some(3)),
            },
            maplit::btreemap! {
                "status" => sea_orm::Value::String(Some(Box::new("pending".to_string()))),
                "count" => sea_orm::Value::BigInt(Some(1)),
            },
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let counts = repo.count_by_status("shop", "product", "p1").await.unwrap();

        assert_eq!(counts.get(CommentStatus::Approved), 3);
        assert_eq!(counts.get(CommentStatus::Pending), 1);
        assert_eq!(counts.get(CommentStatus::Rejected), 0);
        assert_eq!(counts.total(), 4);
    }

    #[tokio::test]
    async fn test_increment_reply_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        assert!(repo.increment_reply_count("c1").await.is_ok());
    }

    #[tokio::test]
    async fn test_set_reaction_counts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let tally = ReactionTally {
            like_count: 2,
            dislike_count: 0,
            by_type: BTreeMap::from([("like".to_string(), 2)]),
        };
        assert!(repo.set_reaction_counts("c1", &tally).await.is_ok());
    }
}
