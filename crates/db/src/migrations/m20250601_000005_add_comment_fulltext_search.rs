//! Add full-text search index for comments.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Must match the expression used by the search query to be picked up
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_comment_text_search
                ON comment
                USING GIN (to_tsvector('simple', content || ' ' || author_name))
                WHERE is_deleted = false AND status = 'approved';
                ",
            )
            .await?;

        // Pinned comments first on resource listings
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE INDEX IF NOT EXISTS idx_comment_pinned
                ON comment (tenant_id, resource_type, resource_id, is_pinned DESC, created_at DESC)
                WHERE parent_id IS NULL AND is_deleted = false;
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_comment_text_search;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_comment_pinned;")
            .await?;

        Ok(())
    }
}
