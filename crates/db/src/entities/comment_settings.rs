//! Per-tenant, per-resource-type comment settings entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::comment_reaction::ReactionType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment_settings")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique together with `resource_type`
    #[sea_orm(indexed)]
    pub tenant_id: String,

    pub resource_type: String,

    pub comments_enabled: bool,
    pub require_approval: bool,
    pub allow_anonymous: bool,
    pub allow_replies: bool,
    pub max_reply_depth: i32,
    pub allow_reactions: bool,

    /// `Vec<ReactionType>`
    #[sea_orm(column_type = "JsonBinary")]
    pub allowed_reactions: Json,

    pub allow_attachments: bool,
    pub max_attachments: i32,
    pub max_comment_length: i32,
    pub notify_on_new_comment: bool,
    pub notify_on_reply: bool,

    /// Stored but not consulted by moderation
    pub auto_approve_verified: bool,

    pub bad_words_filter: bool,

    /// Tenant-specific words matched in addition to the global list
    #[sea_orm(column_type = "JsonBinary")]
    pub custom_bad_words: Json,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Settings used for a (tenant, resource type) pair nobody has configured yet.
    #[must_use]
    pub fn defaults(
        id: String,
        tenant_id: &str,
        resource_type: &str,
        now: DateTimeWithTimeZone,
    ) -> Self {
        Self {
            id,
            tenant_id: tenant_id.to_string(),
            resource_type: resource_type.to_string(),
            comments_enabled: true,
            require_approval: true,
            allow_anonymous: false,
            allow_replies: true,
            max_reply_depth: 5,
            allow_reactions: true,
            allowed_reactions: serde_json::json!(ReactionType::ALL),
            allow_attachments: false,
            max_attachments: 3,
            max_comment_length: 5000,
            notify_on_new_comment: true,
            notify_on_reply: true,
            auto_approve_verified: false,
            bad_words_filter: true,
            custom_bad_words: serde_json::json!([]),
            created_at: now,
            updated_at: now,
        }
    }

    /// Decoded allowed reaction types; unknown entries are skipped.
    #[must_use]
    pub fn allowed_reactions(&self) -> Vec<ReactionType> {
        self.allowed_reactions
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().and_then(|s| s.parse().ok()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decoded tenant word list.
    #[must_use]
    pub fn custom_bad_words(&self) -> Vec<String> {
        serde_json::from_value(self.custom_bad_words.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
