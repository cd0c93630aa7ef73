//! Business logic services.

#![allow(missing_docs)]

pub mod bad_words;
pub mod comment;
pub mod notification;
pub mod reaction;
pub mod report;
pub mod settings;

pub use bad_words::BadWordDetector;
pub use comment::{
    Author, BulkModerateInput, BulkModerateResult, ClientInfo, CommentPage, CommentService,
    CommentStats, CreateCommentInput, ListCommentsInput, ModerateCommentInput, Pagination,
    UpdateCommentInput,
};
pub use notification::{
    CommentEvent, HttpNotifier, NoOpNotifier, NotificationDispatcher, NotificationRequest,
    Notifier, NotifierService,
};
pub use reaction::{MyReactionsInput, ReactionInput, ReactionService};
pub use report::{CreateReportInput, ReportPage, ReportService, ReviewReportInput};
pub use settings::{SettingsService, UpdateSettingsInput};
