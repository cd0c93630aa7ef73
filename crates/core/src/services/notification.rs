//! Notification dispatch.
//!
//! The comment engine hands events to a [`NotificationDispatcher`], which
//! delivers them on a background task with a bounded timeout. Delivery never
//! affects the caller's result.

use async_trait::async_trait;
use comment_common::{AppError, AppResult, NotifierConfig};
use comment_db::entities::{
    comment::{self, CommentStatus},
    comment_settings,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Longest message body sent for new-comment events.
const PREVIEW_CHARS: usize = 100;

/// Event types emitted by the comment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentEvent {
    /// A root comment became visible.
    New,
    /// A reply became visible.
    Reply,
    /// A comment awaits moderation.
    Pending,
    /// A moderator decided on a comment.
    Moderated,
}

impl CommentEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "comment.new",
            Self::Reply => "comment.reply",
            Self::Pending => "comment.pending",
            Self::Moderated => "comment.moderated",
        }
    }
}

/// Payload accepted by the notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub recipients: Vec<String>,
    pub title: String,
    pub message: String,
    pub data: BTreeMap<String, String>,
    pub channels: Vec<String>,
}

impl NotificationRequest {
    fn for_comment(
        event: CommentEvent,
        recipients: Vec<String>,
        title: &str,
        message: String,
        comment: &comment::Model,
    ) -> Self {
        let data = BTreeMap::from([
            ("comment_id".to_string(), comment.id.clone()),
            ("tenant_id".to_string(), comment.tenant_id.clone()),
            ("resource_type".to_string(), comment.resource_type.clone()),
            ("resource_id".to_string(), comment.resource_id.clone()),
            ("author_id".to_string(), comment.author_id.clone()),
            ("status".to_string(), comment.status.to_string()),
        ]);

        Self {
            kind: event.as_str().to_string(),
            recipients,
            title: title.to_string(),
            message,
            data,
            channels: vec!["push".to_string(), "email".to_string()],
        }
    }
}

/// Sends notifications to an external service.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, request: &NotificationRequest) -> AppResult<()>;
}

/// Shared notifier handle.
pub type NotifierService = Arc<dyn Notifier>;

/// Notifier that drops everything.
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn send(&self, _request: &NotificationRequest) -> AppResult<()> {
        Ok(())
    }
}

/// Notifier posting JSON to the notification service.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    /// Create a client for `config.service_url`.
    pub fn new(config: &NotifierConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/api/v1/notifications",
                config.service_url.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, request: &NotificationRequest) -> AppResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(AppError::ExternalService(format!(
                "Notification service returned HTTP {status}"
            )));
        }
        Ok(())
    }
}

/// Builds comment notifications and delivers them in the background.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: NotifierService,
    enabled: bool,
    timeout: Duration,
    admin_recipients: Arc<Vec<String>>,
}

impl NotificationDispatcher {
    /// Create a dispatcher around `notifier`.
    #[must_use]
    pub fn new(notifier: NotifierService, config: &NotifierConfig) -> Self {
        Self {
            notifier,
            enabled: config.enabled,
            timeout: Duration::from_secs(config.timeout_secs),
            admin_recipients: Arc::new(config.admin_recipients.clone()),
        }
    }

    /// A dispatcher that never sends anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            notifier: Arc::new(NoOpNotifier),
            enabled: false,
            timeout: Duration::from_secs(1),
            admin_recipients: Arc::new(Vec::new()),
        }
    }

    /// Notification for a freshly created comment, if one is due.
    #[must_use]
    pub fn creation_request(
        &self,
        comment: &comment::Model,
        settings: &comment_settings::Model,
    ) -> Option<NotificationRequest> {
        if comment.is_root() && !settings.notify_on_new_comment {
            return None;
        }
        if !comment.is_root() && !settings.notify_on_reply {
            return None;
        }

        let (event, title) = match (comment.status, comment.is_root()) {
            (CommentStatus::Pending, _) => (CommentEvent::Pending, "Comment Pending Approval"),
            (_, true) => (CommentEvent::New, "New Comment"),
            (_, false) => (CommentEvent::Reply, "New Reply"),
        };

        Some(NotificationRequest::for_comment(
            event,
            self.admin_recipients.as_ref().clone(),
            title,
            preview(&comment.content),
            comment,
        ))
    }

    /// Notification telling the author about a moderation decision.
    #[must_use]
    pub fn moderation_request(comment: &comment::Model) -> NotificationRequest {
        let (title, message) = if comment.status == CommentStatus::Approved {
            (
                "Your Comment Was Approved",
                "Your comment has been approved and is now visible.".to_string(),
            )
        } else {
            let mut message = "Your comment has been rejected.".to_string();
            if let Some(reason) = comment.rejection_reason.as_deref().filter(|r| !r.is_empty()) {
                message.push_str(" Reason: ");
                message.push_str(reason);
            }
            ("Your Comment Was Rejected", message)
        };

        NotificationRequest::for_comment(
            CommentEvent::Moderated,
            vec![comment.author_id.clone()],
            title,
            message,
            comment,
        )
    }

    /// Queue the creation notification for `comment`.
    pub fn comment_created(&self, comment: &comment::Model, settings: &comment_settings::Model) {
        if !self.enabled {
            return;
        }
        if let Some(request) = self.creation_request(comment, settings) {
            self.dispatch(request);
        }
    }

    /// Queue the moderation-outcome notification for `comment`.
    pub fn comment_moderated(&self, comment: &comment::Model) {
        if self.enabled {
            self.dispatch(Self::moderation_request(comment));
        }
    }

    /// Send `request` on a background task bounded by the configured timeout.
    pub fn dispatch(&self, request: NotificationRequest) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, notifier.send(&request)).await {
                Ok(Ok(())) => {
                    tracing::debug!(kind = %request.kind, "Notification sent");
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, kind = %request.kind, "Failed to send notification");
                }
                Err(_) => {
                    tracing::warn!(
                        kind = %request.kind,
                        timeout_secs = timeout.as_secs(),
                        "Notification delivery timed out"
                    );
                }
            }
        })
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        content.to_string()
    } else {
        let mut cut: String = content.chars().take(PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn test_comment(parent_id: Option<&str>, status: CommentStatus) -> comment::Model {
        let now = Utc::now().into();
        comment::Model {
            id: "c1".to_string(),
            tenant_id: "shop".to_string(),
            resource_type: "product".to_string(),
            resource_id: "p1".to_string(),
            parent_id: parent_id.map(ToString::to_string),
            root_id: parent_id.map(ToString::to_string),
            depth: i32::from(parent_id.is_some()),
            author_id: "u1".to_string(),
            author_name: "Alice".to_string(),
            author_email: None,
            is_anonymous: false,
            content: "Great product!".to_string(),
            content_html: None,
            attachments: json!([]),
            metadata: json!({}),
            status,
            moderated_by: None,
            moderated_at: None,
            rejection_reason: None,
            flagged_words: json!([]),
            report_count: 0,
            is_pinned: false,
            pinned_by: None,
            pinned_at: None,
            is_edited: false,
            edit_history: json!([]),
            reply_count: 0,
            like_count: 0,
            dislike_count: 0,
            reaction_counts: json!({}),
            ip_address: None,
            user_agent: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn settings() -> comment_settings::Model {
        comment_settings::Model::defaults("s1".to_string(), "shop", "product", Utc::now().into())
    }

    struct ChannelNotifier(mpsc::UnboundedSender<NotificationRequest>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        async fn send(&self, request: &NotificationRequest) -> AppResult<()> {
            self.0
                .send(request.clone())
                .map_err(|e| AppError::Internal(e.to_string()))
        }
    }

    struct HangingNotifier;

    #[async_trait]
    impl Notifier for HangingNotifier {
        async fn send(&self, _request: &NotificationRequest) -> AppResult<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[test]
    fn test_event_selection() {
        let dispatcher = NotificationDispatcher::new(Arc::new(NoOpNotifier), &NotifierConfig::default());

        let pending = dispatcher
            .creation_request(&test_comment(None, CommentStatus::Pending), &settings())
            .unwrap();
        let root = dispatcher
            .creation_request(&test_comment(None, CommentStatus::Approved), &settings())
            .unwrap();
        let reply = dispatcher
            .creation_request(&test_comment(Some("p"), CommentStatus::Approved), &settings())
            .unwrap();

        assert_eq!(pending.kind, "comment.pending");
        assert_eq!(root.kind, "comment.new");
        assert_eq!(reply.kind, "comment.reply");
        assert_eq!(root.recipients, vec!["admin"]);
        assert_eq!(root.data["resource_id"], "p1");
        assert_eq!(root.data["status"], "approved");
        assert_eq!(root.data["author_id"], "u1");
    }

    #[test]
    fn test_settings_toggles_suppress_events() {
        let dispatcher = NotificationDispatcher::new(Arc::new(NoOpNotifier), &NotifierConfig::default());
        let quiet = comment_settings::Model {
            notify_on_new_comment: false,
            notify_on_reply: false,
            ..settings()
        };

        assert!(
            dispatcher
                .creation_request(&test_comment(None, CommentStatus::Approved), &quiet)
                .is_none()
        );
        assert!(
            dispatcher
                .creation_request(&test_comment(Some("p"), CommentStatus::Pending), &quiet)
                .is_none()
        );
    }

    #[test]
    fn test_moderation_messages() {
        let approved = NotificationDispatcher::moderation_request(&test_comment(
            None,
            CommentStatus::Approved,
        ));
        assert_eq!(approved.kind, "comment.moderated");
        assert_eq!(approved.recipients, vec!["u1"]);
        assert_eq!(approved.title, "Your Comment Was Approved");

        let mut rejected = test_comment(None, CommentStatus::Rejected);
        rejected.rejection_reason = Some("off-topic".to_string());
        let rejected = NotificationDispatcher::moderation_request(&rejected);
        assert_eq!(rejected.title, "Your Comment Was Rejected");
        assert_eq!(
            rejected.message,
            "Your comment has been rejected. Reason: off-topic"
        );
    }

    #[test]
    fn test_preview_truncates_long_content() {
        let long = "x".repeat(150);
        let cut = preview(&long);

        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher =
            NotificationDispatcher::new(Arc::new(ChannelNotifier(tx)), &NotifierConfig::default());

        dispatcher.comment_created(&test_comment(None, CommentStatus::Approved), &settings());

        let sent = rx.recv().await.unwrap();
        assert_eq!(sent.kind, "comment.new");
        assert_eq!(sent.channels, vec!["push", "email"]);
    }

    #[tokio::test]
    async fn test_disabled_dispatcher_sends_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = NotifierConfig {
            enabled: false,
            ..NotifierConfig::default()
        };
        let dispatcher = NotificationDispatcher::new(Arc::new(ChannelNotifier(tx)), &config);

        dispatcher.comment_moderated(&test_comment(None, CommentStatus::Approved));
        drop(dispatcher);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_notifier_is_abandoned_after_timeout() {
        let dispatcher =
            NotificationDispatcher::new(Arc::new(HangingNotifier), &NotifierConfig::default());

        let handle = dispatcher.dispatch(NotificationDispatcher::moderation_request(
            &test_comment(None, CommentStatus::Approved),
        ));

        // completes once the paused clock passes the timeout
        tokio::time::timeout(Duration::from_secs(60), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
