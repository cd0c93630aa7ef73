//! Settings resolver.
//!
//! One settings record per (tenant, resource type), materialized with defaults
//! on first access.

use chrono::Utc;
use comment_common::{AppError, AppResult, IdGenerator};
use comment_db::{
    SettingsStoreRef,
    entities::{comment_reaction::ReactionType, comment_settings},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Partial settings update; absent fields are left unchanged.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsInput {
    pub comments_enabled: Option<bool>,
    pub require_approval: Option<bool>,
    pub allow_anonymous: Option<bool>,
    pub allow_replies: Option<bool>,
    #[validate(range(min = 0, max = 50))]
    pub max_reply_depth: Option<i32>,
    pub allow_reactions: Option<bool>,
    pub allowed_reactions: Option<Vec<ReactionType>>,
    pub allow_attachments: Option<bool>,
    #[validate(range(min = 0, max = 20))]
    pub max_attachments: Option<i32>,
    #[validate(range(min = 1, max = 100_000))]
    pub max_comment_length: Option<i32>,
    pub notify_on_new_comment: Option<bool>,
    pub notify_on_reply: Option<bool>,
    pub auto_approve_verified: Option<bool>,
    pub bad_words_filter: Option<bool>,
    #[validate(length(max = 500))]
    pub custom_bad_words: Option<Vec<String>>,
}

impl UpdateSettingsInput {
    fn into_patch(self) -> comment_settings::ActiveModel {
        let mut patch = comment_settings::ActiveModel::default();

        if let Some(comments_enabled) = self.comments_enabled {
            patch.comments_enabled = Set(comments_enabled);
        }
        if let Some(require_approval) = self.require_approval {
            patch.require_approval = Set(require_approval);
        }
        if let Some(allow_anonymous) = self.allow_anonymous {
            patch.allow_anonymous = Set(allow_anonymous);
        }
        if let Some(allow_replies) = self.allow_replies {
            patch.allow_replies = Set(allow_replies);
        }
        if let Some(max_reply_depth) = self.max_reply_depth {
            patch.max_reply_depth = Set(max_reply_depth);
        }
        if let Some(allow_reactions) = self.allow_reactions {
            patch.allow_reactions = Set(allow_reactions);
        }
        if let Some(allowed_reactions) = self.allowed_reactions {
            patch.allowed_reactions = Set(serde_json::json!(allowed_reactions));
        }
        if let Some(allow_attachments) = self.allow_attachments {
            patch.allow_attachments = Set(allow_attachments);
        }
        if let Some(max_attachments) = self.max_attachments {
            patch.max_attachments = Set(max_attachments);
        }
        if let Some(max_comment_length) = self.max_comment_length {
            patch.max_comment_length = Set(max_comment_length);
        }
        if let Some(notify_on_new_comment) = self.notify_on_new_comment {
            patch.notify_on_new_comment = Set(notify_on_new_comment);
        }
        if let Some(notify_on_reply) = self.notify_on_reply {
            patch.notify_on_reply = Set(notify_on_reply);
        }
        if let Some(auto_approve_verified) = self.auto_approve_verified {
            patch.auto_approve_verified = Set(auto_approve_verified);
        }
        if let Some(bad_words_filter) = self.bad_words_filter {
            patch.bad_words_filter = Set(bad_words_filter);
        }
        if let Some(custom_bad_words) = self.custom_bad_words {
            patch.custom_bad_words = Set(serde_json::json!(custom_bad_words));
        }

        patch
    }
}

/// Resolves effective settings for a (tenant, resource type) pair.
#[derive(Clone)]
pub struct SettingsService {
    store: SettingsStoreRef,
    id_gen: IdGenerator,
}

impl SettingsService {
    /// Create a new settings service.
    #[must_use]
    pub const fn new(store: SettingsStoreRef) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    fn defaults(&self, tenant_id: &str, resource_type: &str) -> comment_settings::Model {
        comment_settings::Model::defaults(
            self.id_gen.generate(),
            tenant_id,
            resource_type,
            Utc::now().into(),
        )
    }

    /// Get settings, creating the defaults on first access.
    ///
    /// A concurrent creator winning the insert is not an error: the stored
    /// record is re-read and returned.
    pub async fn get_or_create(
        &self,
        tenant_id: &str,
        resource_type: &str,
    ) -> AppResult<comment_settings::Model> {
        if let Some(settings) = self.store.find(tenant_id, resource_type).await? {
            return Ok(settings);
        }

        match self
            .store
            .insert(self.defaults(tenant_id, resource_type))
            .await
        {
            Ok(settings) => {
                tracing::info!(
                    tenant_id = %tenant_id,
                    resource_type = %resource_type,
                    "Created default comment settings"
                );
                Ok(settings)
            }
            Err(e) if e.is_conflict() => {
                tracing::debug!(
                    tenant_id = %tenant_id,
                    resource_type = %resource_type,
                    "Settings created concurrently, re-reading"
                );
                self.store
                    .find(tenant_id, resource_type)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!(
                            "settings for {tenant_id}/{resource_type} conflicted but are missing"
                        ))
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Apply the supplied fields, creating the record if needed.
    pub async fn update(
        &self,
        tenant_id: &str,
        resource_type: &str,
        input: UpdateSettingsInput,
    ) -> AppResult<comment_settings::Model> {
        input.validate()?;

        let settings = self
            .store
            .upsert(self.defaults(tenant_id, resource_type), input.into_patch())
            .await?;

        tracing::info!(
            tenant_id = %tenant_id,
            resource_type = %resource_type,
            "Updated comment settings"
        );
        Ok(settings)
    }

    /// All stored settings of a tenant.
    pub async fn list_for_tenant(&self, tenant_id: &str) -> AppResult<Vec<comment_settings::Model>> {
        self.store.find_by_tenant(tenant_id).await
    }
}
