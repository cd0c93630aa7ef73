//! Comment settings repository.

use std::sync::Arc;

use async_trait::async_trait;
use comment_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    Iterable, QueryFilter, QueryOrder, sea_query::OnConflict,
};

use crate::entities::{CommentSettings, comment_settings};
use crate::store::SettingsStore;

/// Settings repository for database operations.
#[derive(Clone)]
pub struct SettingsRepository {
    db: Arc<DatabaseConnection>,
}

impl SettingsRepository {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

/// Columns a partial update may never touch.
const fn is_key_column(column: comment_settings::Column) -> bool {
    matches!(
        column,
        comment_settings::Column::Id
            | comment_settings::Column::TenantId
            | comment_settings::Column::ResourceType
            | comment_settings::Column::CreatedAt
    )
}

/// Overlay the `Set` fields of `patch` onto `defaults`; returns the merged
/// active model and the columns that came from the patch.
pub(crate) fn overlay(
    defaults: comment_settings::Model,
    patch: &comment_settings::ActiveModel,
) -> (comment_settings::ActiveModel, Vec<comment_settings::Column>) {
    let mut active = defaults.into_active_model().reset_all();
    let mut changed = Vec::new();

    for column in comment_settings::Column::iter() {
        if is_key_column(column) || matches!(column, comment_settings::Column::UpdatedAt) {
            continue;
        }
        if let ActiveValue::Set(value) = patch.get(column) {
            active.set(column, value);
            changed.push(column);
        }
    }
    changed.push(comment_settings::Column::UpdatedAt);

    (active, changed)
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn find(
        &self,
        tenant_id: &str,
        resource_type: &str,
    ) -> AppResult<Option<comment_settings::Model>> {
        CommentSettings::find()
            .filter(comment_settings::Column::TenantId.eq(tenant_id))
            .filter(comment_settings::Column::ResourceType.eq(resource_type))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert(&self, model: comment_settings::Model) -> AppResult<comment_settings::Model> {
        model
            .into_active_model()
            .reset_all()
            .insert(self.db.as_ref())
            .await
            .map_err(super::db_err)
    }

    async fn upsert(
        &self,
        defaults: comment_settings::Model,
        patch: comment_settings::ActiveModel,
    ) -> AppResult<comment_settings::Model> {
        let tenant_id = defaults.tenant_id.clone();
        let resource_type = defaults.resource_type.clone();
        let (active, changed) = overlay(defaults, &patch);

        CommentSettings::insert(active)
            .on_conflict(
                OnConflict::columns([
                    comment_settings::Column::TenantId,
                    comment_settings::Column::ResourceType,
                ])
                .update_columns(changed)
                .to_owned(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find(&tenant_id, &resource_type).await?.ok_or_else(|| {
            AppError::Internal(format!(
                "settings for {tenant_id}/{resource_type} missing after upsert"
            ))
        })
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> AppResult<Vec<comment_settings::Model>> {
        CommentSettings::find()
            .filter(comment_settings::Column::TenantId.eq(tenant_id))
            .order_by_asc(comment_settings::Column::ResourceType)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, IdenStatic, MockDatabase, Set};

    fn names(columns: &[comment_settings::Column]) -> Vec<&str> {
        columns.iter().map(IdenStatic::as_str).collect()
    }

    fn defaults(tenant_id: &str, resource_type: &str) -> comment_settings::Model {
        comment_settings::Model::defaults(
            "s1".to_string(),
            tenant_id,
            resource_type,
            Utc::now().into(),
        )
    }

    #[tokio::test]
    async fn test_find_returns_stored_settings() {
        let stored = defaults("shop", "product");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored.clone()]])
                .into_connection(),
        );

        let repo = SettingsRepository::new(db);
        let found = repo.find("shop", "product").await.unwrap();

        assert_eq!(found, Some(stored));
    }

    #[tokio::test]
    async fn test_find_by_tenant() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[defaults("shop", "article"), defaults("shop", "product")]])
                .into_connection(),
        );

        let repo = SettingsRepository::new(db);
        let all = repo.find_by_tenant("shop").await.unwrap();

        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_overlay_only_takes_set_fields() {
        let patch = comment_settings::ActiveModel {
            require_approval: Set(false),
            max_reply_depth: Set(2),
            ..Default::default()
        };

        let (active, changed) = overlay(defaults("shop", "product"), &patch);

        assert_eq!(active.require_approval, Set(false));
        assert_eq!(active.max_reply_depth, Set(2));
        assert_eq!(active.allow_replies, Set(true));
        assert_eq!(
            names(&changed),
            vec!["require_approval", "max_reply_depth", "updated_at"]
        );
    }

    #[test]
    fn test_overlay_ignores_key_columns() {
        let patch = comment_settings::ActiveModel {
            tenant_id: Set("other".to_string()),
            ..Default::default()
        };

        let (active, changed) = overlay(defaults("shop", "product"), &patch);

        assert_eq!(active.tenant_id, Set("shop".to_string()));
        assert_eq!(names(&changed), vec!["updated_at"]);
    }
}
