//! Error types for the comment service.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Transport-neutral classification of an [`AppError`].
///
/// Services branch on the kind; only the HTTP layer turns it into a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, limits exceeded, unknown enum values.
    Validation,
    /// The target record does not exist.
    NotFound,
    /// The caller does not own the target record.
    Forbidden,
    /// A tenant setting forbids the operation.
    PolicyViolation,
    /// A uniqueness constraint was hit.
    Conflict,
    /// No caller identity was supplied.
    Unauthorized,
    /// The caller exceeded the request budget.
    RateLimited,
    /// Store, configuration or collaborator failure.
    Internal,
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Comment not found: {0}")]
    CommentNotFound(String),

    #[error("Parent comment not found: {0}")]
    ParentNotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Comment exceeds maximum length of {max} characters")]
    ContentTooLong { max: i32 },

    #[error("Cannot edit a deleted comment")]
    CannotEditDeleted,

    #[error("Cannot react to a deleted comment")]
    CannotReactToDeleted,

    // === Policy Violations ===
    #[error("Comments are disabled for this resource")]
    CommentsDisabled,

    #[error("Anonymous comments are not allowed")]
    AnonymousNotAllowed,

    #[error("Replies are not allowed")]
    RepliesNotAllowed,

    #[error("Maximum reply depth of {max} exceeded")]
    MaxDepthExceeded { max: i32 },

    #[error("Reactions are disabled for this resource")]
    ReactionsDisabled,

    #[error("Reaction type not allowed: {0}")]
    ReactionNotAllowed(String),

    // === Conflicts ===
    #[error("You have already reported this comment")]
    AlreadyReported,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classifies this error without reference to any transport.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_)
            | Self::Validation(_)
            | Self::ContentTooLong { .. }
            | Self::CannotEditDeleted
            | Self::CannotReactToDeleted => ErrorKind::Validation,
            Self::NotFound(_) | Self::CommentNotFound(_) | Self::ParentNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::CommentsDisabled
            | Self::AnonymousNotAllowed
            | Self::RepliesNotAllowed
            | Self::MaxDepthExceeded { .. }
            | Self::ReactionsDisabled
            | Self::ReactionNotAllowed(_) => ErrorKind::PolicyViolation,
            Self::AlreadyReported | Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::Database(_) | Self::Config(_) | Self::ExternalService(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::CommentNotFound(_) => "COMMENT_NOT_FOUND",
            Self::ParentNotFound(_) => "PARENT_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::CannotEditDeleted => "CANNOT_EDIT_DELETED",
            Self::CannotReactToDeleted => "CANNOT_REACT_TO_DELETED",
            Self::CommentsDisabled => "COMMENTS_DISABLED",
            Self::AnonymousNotAllowed => "ANONYMOUS_NOT_ALLOWED",
            Self::RepliesNotAllowed => "REPLIES_NOT_ALLOWED",
            Self::MaxDepthExceeded { .. } => "MAX_DEPTH_EXCEEDED",
            Self::ReactionsDisabled => "REACTIONS_DISABLED",
            Self::ReactionNotAllowed(_) => "REACTION_NOT_ALLOWED",
            Self::AlreadyReported => "ALREADY_REPORTED",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error is a uniqueness conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

#[cfg(feature = "axum")]
mod http {
    use super::{AppError, ErrorKind};
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde_json::json;

    impl AppError {
        /// Returns the HTTP status code for this error.
        #[must_use]
        pub const fn status_code(&self) -> StatusCode {
            match self.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden | ErrorKind::PolicyViolation => StatusCode::FORBIDDEN,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
                ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            let code = self.error_code();

            if self.is_server_error() {
                tracing::error!(error = %self, code = code, "Server error occurred");
            } else {
                tracing::debug!(error = %self, code = code, "Client error occurred");
            }

            let body = Json(json!({
                "success": false,
                "error": {
                    "code": code,
                    "message": self.to_string(),
                }
            }));

            (status, body).into_response()
        }
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_errors_are_distinct_from_validation() {
        assert_eq!(AppError::CommentsDisabled.kind(), ErrorKind::PolicyViolation);
        assert_eq!(
            AppError::MaxDepthExceeded { max: 5 }.kind(),
            ErrorKind::PolicyViolation
        );
        assert_eq!(
            AppError::ContentTooLong { max: 5000 }.kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_forbidden_is_not_not_found() {
        assert_eq!(
            AppError::Forbidden("x".to_string()).kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            AppError::CommentNotFound("x".to_string()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_conflicts() {
        assert!(AppError::AlreadyReported.is_conflict());
        assert!(AppError::Conflict("dup".to_string()).is_conflict());
        assert!(!AppError::Database("dup".to_string()).is_conflict());
    }

    #[test]
    fn test_already_reported_message() {
        assert_eq!(
            AppError::AlreadyReported.to_string(),
            "You have already reported this comment"
        );
    }
}
