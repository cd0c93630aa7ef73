//! Create comment settings table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommentSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommentSettings::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CommentSettings::TenantId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommentSettings::ResourceType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(flag(CommentSettings::CommentsEnabled, true))
                    .col(flag(CommentSettings::RequireApproval, true))
                    .col(flag(CommentSettings::AllowAnonymous, false))
                    .col(flag(CommentSettings::AllowReplies, true))
                    .col(
                        ColumnDef::new(CommentSettings::MaxReplyDepth)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    .col(flag(CommentSettings::AllowReactions, true))
                    .col(
                        ColumnDef::new(CommentSettings::AllowedReactions)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(flag(CommentSettings::AllowAttachments, false))
                    .col(
                        ColumnDef::new(CommentSettings::MaxAttachments)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(CommentSettings::MaxCommentLength)
                            .integer()
                            .not_null()
                            .default(5000),
                    )
                    .col(flag(CommentSettings::NotifyOnNewComment, true))
                    .col(flag(CommentSettings::NotifyOnReply, true))
                    .col(flag(CommentSettings::AutoApproveVerified, false))
                    .col(flag(CommentSettings::BadWordsFilter, true))
                    .col(
                        ColumnDef::new(CommentSettings::CustomBadWords)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(CommentSettings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CommentSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One settings row per (tenant, resource type); concurrent first access relies on it
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_settings_tenant_resource_type")
                    .table(CommentSettings::Table)
                    .col(CommentSettings::TenantId)
                    .col(CommentSettings::ResourceType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentSettings::Table).to_owned())
            .await
    }
}

fn flag(column: CommentSettings, default: bool) -> ColumnDef {
    ColumnDef::new(column)
        .boolean()
        .not_null()
        .default(default)
        .to_owned()
}

#[derive(Iden)]
enum CommentSettings {
    Table,
    Id,
    TenantId,
    ResourceType,
    CommentsEnabled,
    RequireApproval,
    AllowAnonymous,
    AllowReplies,
    MaxReplyDepth,
    AllowReactions,
    AllowedReactions,
    AllowAttachments,
    MaxAttachments,
    MaxCommentLength,
    NotifyOnNewComment,
    NotifyOnReply,
    AutoApproveVerified,
    BadWordsFilter,
    CustomBadWords,
    CreatedAt,
    UpdatedAt,
}
