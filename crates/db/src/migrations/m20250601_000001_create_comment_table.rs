//! Create comment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comment::TenantId).string_len(128).not_null())
                    .col(ColumnDef::new(Comment::ResourceType).string_len(64).not_null())
                    .col(ColumnDef::new(Comment::ResourceId).string_len(128).not_null())
                    .col(ColumnDef::new(Comment::ParentId).string_len(32))
                    .col(ColumnDef::new(Comment::RootId).string_len(32))
                    .col(ColumnDef::new(Comment::Depth).integer().not_null().default(0))
                    .col(ColumnDef::new(Comment::AuthorId).string_len(128).not_null())
                    .col(ColumnDef::new(Comment::AuthorName).string_len(256).not_null())
                    .col(ColumnDef::new(Comment::AuthorEmail).string_len(256))
                    .col(
                        ColumnDef::new(Comment::IsAnonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Comment::Content).text().not_null())
                    .col(ColumnDef::new(Comment::ContentHtml).text())
                    .col(
                        ColumnDef::new(Comment::Attachments)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Comment::Metadata)
                            .json_binary()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(Comment::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Comment::ModeratedBy).string_len(128))
                    .col(ColumnDef::new(Comment::ModeratedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Comment::RejectionReason).text())
                    .col(
                        ColumnDef::new(Comment::FlaggedWords)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Comment::ReportCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comment::IsPinned)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Comment::PinnedBy).string_len(128))
                    .col(ColumnDef::new(Comment::PinnedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Comment::IsEdited)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Comment::EditHistory)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Comment::ReplyCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comment::LikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comment::DislikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comment::ReactionCounts)
                            .json_binary()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(Comment::IpAddress).string_len(64))
                    .col(ColumnDef::new(Comment::UserAgent).text())
                    .col(
                        ColumnDef::new(Comment::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Comment::DeletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Comment::DeletedBy).string_len(128))
                    .col(
                        ColumnDef::new(Comment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Comment::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_parent")
                            .from(Comment::Table, Comment::ParentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing comments on a resource
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_resource")
                    .table(Comment::Table)
                    .col(Comment::TenantId)
                    .col(Comment::ResourceType)
                    .col(Comment::ResourceId)
                    .col(Comment::Status)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_parent_id")
                    .table(Comment::Table)
                    .col(Comment::ParentId)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_author_id")
                    .table(Comment::Table)
                    .col(Comment::TenantId)
                    .col(Comment::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Moderation queue
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_status_created_at")
                    .table(Comment::Table)
                    .col(Comment::Status)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_like_count")
                    .table(Comment::Table)
                    .col(Comment::LikeCount)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
    TenantId,
    ResourceType,
    ResourceId,
    ParentId,
    RootId,
    Depth,
    AuthorId,
    AuthorName,
    AuthorEmail,
    IsAnonymous,
    Content,
    ContentHtml,
    Attachments,
    Metadata,
    Status,
    ModeratedBy,
    ModeratedAt,
    RejectionReason,
    FlaggedWords,
    ReportCount,
    IsPinned,
    PinnedBy,
    PinnedAt,
    IsEdited,
    EditHistory,
    ReplyCount,
    LikeCount,
    DislikeCount,
    ReactionCounts,
    IpAddress,
    UserAgent,
    IsDeleted,
    DeletedAt,
    DeletedBy,
    CreatedAt,
    UpdatedAt,
}
