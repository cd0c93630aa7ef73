//! Create comment reaction table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommentReaction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentReaction::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CommentReaction::CommentId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommentReaction::UserId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommentReaction::ReactionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommentReaction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CommentReaction::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_reaction_comment")
                            .from(CommentReaction::Table, CommentReaction::CommentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (comment_id, user_id) - one reaction per user per comment
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_reaction_comment_user")
                    .table(CommentReaction::Table)
                    .col(CommentReaction::CommentId)
                    .col(CommentReaction::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Counting reactions by type
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_reaction_comment_type")
                    .table(CommentReaction::Table)
                    .col(CommentReaction::CommentId)
                    .col(CommentReaction::ReactionType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentReaction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CommentReaction {
    Table,
    Id,
    CommentId,
    UserId,
    ReactionType,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
}
