//! Comment reaction repository.

use std::sync::Arc;

use async_trait::async_trait;
use comment_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    IntoActiveModel, QueryFilter, QuerySelect, sea_query::{Expr, OnConflict},
};

use crate::entities::{
    CommentReaction,
    comment_reaction::{self, ReactionType},
};
use crate::store::ReactionStore;

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, FromQueryResult)]
struct TypeCountRow {
    reaction_type: ReactionType,
    count: i64,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReactionStore for ReactionRepository {
    async fn upsert(
        &self,
        model: comment_reaction::Model,
    ) -> AppResult<comment_reaction::Model> {
        let comment_id = model.comment_id.clone();
        let user_id = model.user_id.clone();

        CommentReaction::insert(model.into_active_model().reset_all())
            .on_conflict(
                OnConflict::columns([
                    comment_reaction::Column::CommentId,
                    comment_reaction::Column::UserId,
                ])
                .update_columns([
                    comment_reaction::Column::ReactionType,
                    comment_reaction::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find(&comment_id, &user_id).await?.ok_or_else(|| {
            AppError::Internal(format!("reaction of {user_id} on {comment_id} missing after upsert"))
        })
    }

    async fn delete(&self, comment_id: &str, user_id: &str) -> AppResult<bool> {
        let result = CommentReaction::delete_many()
            .filter(comment_reaction::Column::CommentId.eq(comment_id))
            .filter(comment_reaction::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    async fn find(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> AppResult<Option<comment_reaction::Model>> {
        CommentReaction::find()
            .filter(comment_reaction::Column::CommentId.eq(comment_id))
            .filter(comment_reaction::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        comment_ids: &[String],
    ) -> AppResult<Vec<comment_reaction::Model>> {
        if comment_ids.is_empty() {
            return Ok(vec![]);
        }

        CommentReaction::find()
            .filter(comment_reaction::Column::UserId.eq(user_id))
            .filter(comment_reaction::Column::CommentId.is_in(comment_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn count_by_type(&self, comment_id: &str) -> AppResult<Vec<(ReactionType, u64)>> {
        let rows = CommentReaction::find()
            .select_only()
            .column(comment_reaction::Column::ReactionType)
            .column_as(Expr::col(comment_reaction::Column::Id).count(), "count")
            .filter(comment_reaction::Column::CommentId.eq(comment_id))
            .group_by(comment_reaction::Column::ReactionType)
            .into_model::<TypeCountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.reaction_type, u64::try_from(row.count).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_reaction(comment_id: &str, user_id: &str, kind: ReactionType) -> comment_reaction::Model {
        let now = Utc::now().into();
        comment_reaction::Model {
            id: format!("r-{user_id}"),
            comment_id: comment_id.to_string(),
            user_id: user_id.to_string(),
            reaction_type: kind,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_find_by_user_empty_ids_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = ReactionRepository::new(db);
        let result = repo.find_by_user("u1", &[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_user() {
        let r1 = create_test_reaction("c1", "u1", ReactionType::Like);
        let r2 = create_test_reaction("c2", "u1", ReactionType::Sad);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[r1, r2]])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let result = repo
            .find_by_user("u1", &["c1".to_string(), "c2".to_string()])
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_removed() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        assert!(repo.delete("c1", "u1").await.unwrap());
        assert!(!repo.delete("c1", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_by_type() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    maplit::btreemap! {
                        "reaction_type" => sea_orm::Value::String(Some(Box::new("like".to_string()))),
                        "count" => sea_orm::Value::BigInt(Some(4)),
                    },
                    maplit::btreemap! {
                        "reaction_type" => sea_orm::Value::String(Some(Box::new("wow".to_string()))),
                        "count" => sea_orm::Value::BigInt(Some(1)),
                    },
                ]])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let counts = repo.count_by_type("c1").await.unwrap();

        assert_eq!(counts, vec![(ReactionType::Like, 4), (ReactionType::Wow, 1)]);
    }
}
