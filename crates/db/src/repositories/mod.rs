//! Postgres-backed store implementations.

mod comment;
mod reaction;
mod report;
mod settings;

pub use comment::CommentRepository;
pub use reaction::ReactionRepository;
pub use report::ReportRepository;
pub use settings::SettingsRepository;

pub(crate) use settings::overlay as overlay_settings;

use comment_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Map a store error, keeping uniqueness violations distinguishable.
pub(crate) fn db_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
        _ => AppError::Database(err.to_string()),
    }
}
