//! Comment report entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Why a comment was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    #[sea_orm(string_value = "spam")]
    Spam,
    #[sea_orm(string_value = "inappropriate")]
    Inappropriate,
    #[sea_orm(string_value = "harassment")]
    Harassment,
    #[sea_orm(string_value = "hate_speech")]
    HateSpeech,
    #[sea_orm(string_value = "misinformation")]
    Misinformation,
    #[sea_orm(string_value = "other")]
    Other,
}

/// Review state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "reviewed")]
    Reviewed,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

impl std::str::FromStr for ReportReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spam" => Ok(Self::Spam),
            "inappropriate" => Ok(Self::Inappropriate),
            "harassment" => Ok(Self::Harassment),
            "hate_speech" => Ok(Self::HateSpeech),
            "misinformation" => Ok(Self::Misinformation),
            "other" => Ok(Self::Other),
            other => Err(format!("invalid report reason: {other}")),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(format!("invalid report status: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment_report")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique together with `reporter_id`
    #[sea_orm(indexed)]
    pub comment_id: String,

    pub reporter_id: String,

    pub reason: ReportReason,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub status: ReportStatus,

    #[sea_orm(nullable)]
    pub reviewed_by: Option<String>,

    #[sea_orm(nullable)]
    pub reviewed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::comment::Entity",
        from = "Column::CommentId",
        to = "super::comment::Column::Id"
    )]
    Comment,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
