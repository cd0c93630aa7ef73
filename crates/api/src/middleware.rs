//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::Query,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use comment_core::{
    BadWordDetector, CommentService, NotificationDispatcher, ReactionService, ReportService,
    SettingsService,
};
use comment_db::{CommentStoreRef, ReactionStoreRef, ReportStoreRef, SettingsStoreRef};
use serde::Deserialize;

use crate::extractors::{Caller, Tenant};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub comment_service: CommentService,
    pub reaction_service: ReactionService,
    pub report_service: ReportService,
    pub settings_service: SettingsService,
}

impl AppState {
    /// Wire the services over the given stores.
    #[must_use]
    pub fn new(
        comments: CommentStoreRef,
        settings: SettingsStoreRef,
        reactions: ReactionStoreRef,
        reports: ReportStoreRef,
        detector: BadWordDetector,
        notifications: NotificationDispatcher,
    ) -> Self {
        let settings_service = SettingsService::new(settings);
        Self {
            comment_service: CommentService::new(
                comments.clone(),
                settings_service.clone(),
                detector,
                notifications,
            ),
            reaction_service: ReactionService::new(
                comments.clone(),
                reactions,
                settings_service.clone(),
            ),
            report_service: ReportService::new(comments, reports),
            settings_service,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Identity forwarded by the gateway, if any.
fn caller_from_headers(headers: &HeaderMap) -> Option<Caller> {
    let id = header_str(headers, "x-user-id")?;
    let scopes = header_str(headers, "x-user-scopes")
        .map(|s| {
            s.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(Caller {
        id: id.to_string(),
        name: header_str(headers, "x-user-name").map(ToString::to_string),
        email: header_str(headers, "x-user-email").map(ToString::to_string),
        scopes,
    })
}

/// Authentication middleware.
///
/// Trusts the `X-User-*` headers set by the upstream gateway. Requests
/// without `X-User-Id` continue anonymously.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Response {
    if let Some(caller) = caller_from_headers(req.headers()) {
        req.extensions_mut().insert(caller);
    }

    next.run(req).await
}

#[derive(Deserialize)]
struct TenantQuery {
    tenant_id: Option<String>,
}

/// Tenant resolution middleware.
///
/// `X-Tenant-ID` wins over the `tenant_id` query parameter; both absent
/// means the `default` tenant.
pub async fn tenant_middleware(mut req: Request<Body>, next: Next) -> Response {
    let tenant = header_str(req.headers(), "x-tenant-id")
        .map(ToString::to_string)
        .or_else(|| {
            Query::<TenantQuery>::try_from_uri(req.uri())
                .ok()
                .and_then(|Query(q)| q.tenant_id)
                .filter(|t| !t.trim().is_empty())
        })
        .unwrap_or_else(|| Tenant::DEFAULT.to_string());

    req.extensions_mut().insert(Tenant(tenant));
    next.run(req).await
}
