//! Create comment report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommentReport::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentReport::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CommentReport::CommentId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommentReport::ReporterId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CommentReport::Reason).string_len(32).not_null())
                    .col(ColumnDef::new(CommentReport::Description).text())
                    .col(
                        ColumnDef::new(CommentReport::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(CommentReport::ReviewedBy).string_len(128))
                    .col(ColumnDef::new(CommentReport::ReviewedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(CommentReport::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_report_comment")
                            .from(CommentReport::Table, CommentReport::CommentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A reporter may report a comment once
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_report_comment_reporter")
                    .table(CommentReport::Table)
                    .col(CommentReport::CommentId)
                    .col(CommentReport::ReporterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_report_status_created_at")
                    .table(CommentReport::Table)
                    .col(CommentReport::Status)
                    .col(CommentReport::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentReport::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CommentReport {
    Table,
    Id,
    CommentId,
    ReporterId,
    Reason,
    Description,
    Status,
    ReviewedBy,
    ReviewedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
}
