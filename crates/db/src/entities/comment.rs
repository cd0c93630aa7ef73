//! Comment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Moderation status of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "spam")]
    Spam,
}

impl CommentStatus {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Spam => "spam",
        }
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "spam" => Ok(Self::Spam),
            other => Err(format!("invalid comment status: {other}")),
        }
    }
}

/// File or link attached to a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Snapshot of the content a comment had before an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub content: String,
    pub edited_at: DateTimeWithTimeZone,
    pub edited_by: String,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub tenant_id: String,

    /// Kind of the commented resource (e.g. `product`, `article`)
    pub resource_type: String,

    pub resource_id: String,

    #[sea_orm(nullable, indexed)]
    pub parent_id: Option<String>,

    /// Top-most ancestor; `None` for root comments
    #[sea_orm(nullable, indexed)]
    pub root_id: Option<String>,

    /// 0 for roots, parent depth + 1 for replies
    pub depth: i32,

    #[sea_orm(indexed)]
    pub author_id: String,

    pub author_name: String,

    #[sea_orm(nullable)]
    pub author_email: Option<String>,

    pub is_anonymous: bool,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Rendered HTML, produced outside the service
    #[sea_orm(column_type = "Text", nullable)]
    pub content_html: Option<String>,

    /// `Vec<Attachment>`
    #[sea_orm(column_type = "JsonBinary")]
    pub attachments: Json,

    /// Free-form client metadata
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,

    pub status: CommentStatus,

    #[sea_orm(nullable)]
    pub moderated_by: Option<String>,

    #[sea_orm(nullable)]
    pub moderated_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,

    /// Bad words found in the current content
    #[sea_orm(column_type = "JsonBinary")]
    pub flagged_words: Json,

    #[sea_orm(default_value = 0)]
    pub report_count: i32,

    #[sea_orm(default_value = false)]
    pub is_pinned: bool,

    #[sea_orm(nullable)]
    pub pinned_by: Option<String>,

    #[sea_orm(nullable)]
    pub pinned_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(default_value = false)]
    pub is_edited: bool,

    /// `Vec<EditRecord>`, oldest first
    #[sea_orm(column_type = "JsonBinary")]
    pub edit_history: Json,

    #[sea_orm(default_value = 0)]
    pub reply_count: i32,

    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    #[sea_orm(default_value = 0)]
    pub dislike_count: i32,

    /// Reaction type -> count
    #[sea_orm(column_type = "JsonBinary")]
    pub reaction_counts: Json,

    #[sea_orm(nullable)]
    pub ip_address: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_deleted: bool,

    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub deleted_by: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this comment is a top-level comment.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// ID of the thread this comment belongs to.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        self.root_id.as_deref().unwrap_or(&self.id)
    }

    /// Decoded edit history; malformed JSON reads as empty.
    #[must_use]
    pub fn edit_history(&self) -> Vec<EditRecord> {
        serde_json::from_value(self.edit_history.clone()).unwrap_or_default()
    }

    /// Decoded flagged words.
    #[must_use]
    pub fn flagged_words(&self) -> Vec<String> {
        serde_json::from_value(self.flagged_words.clone()).unwrap_or_default()
    }

    /// Decoded attachments.
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        serde_json::from_value(self.attachments.clone()).unwrap_or_default()
    }

    /// Decoded per-type reaction counts.
    #[must_use]
    pub fn reaction_counts(&self) -> BTreeMap<String, i32> {
        serde_json::from_value(self.reaction_counts.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,

    #[sea_orm(has_many = "super::comment_reaction::Entity")]
    Reactions,

    #[sea_orm(has_many = "super::comment_report::Entity")]
    Reports,
}

impl Related<super::comment_reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl Related<super::comment_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
