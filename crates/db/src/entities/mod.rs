//! Database entities.

pub mod comment;
pub mod comment_reaction;
pub mod comment_report;
pub mod comment_settings;

pub use comment::Entity as Comment;
pub use comment_reaction::Entity as CommentReaction;
pub use comment_report::Entity as CommentReport;
pub use comment_settings::Entity as CommentSettings;
