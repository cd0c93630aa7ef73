//! Request extractors.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{Extensions, HeaderMap, header::USER_AGENT, request::Parts},
};
use comment_common::AppError;
use comment_core::{Author, ClientInfo};

/// Scopes that grant moderation rights.
const ADMIN_SCOPES: [&str; 2] = ["admin", "comments:moderate"];

/// Caller identity forwarded by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub scopes: Vec<String>,
}

impl Caller {
    /// Whether the caller may moderate.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.scopes.iter().any(|s| ADMIN_SCOPES.contains(&s.as_str()))
    }

    /// The caller as a comment author.
    #[must_use]
    pub fn author(&self) -> Author {
        Author {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Authenticated caller extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Caller);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional caller extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<Caller>);

impl MaybeAuthUser {
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.as_ref().map(|c| c.id.as_str())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(Caller::is_admin)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Caller>().cloned()))
    }
}

/// Caller with moderation rights.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Caller);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(caller) = AuthUser::from_request_parts(parts, state).await?;
        if !caller.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(caller))
    }
}

/// Resolved tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant(pub String);

impl Tenant {
    pub const DEFAULT: &'static str = "default";
}

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_else(|| Self(Self::DEFAULT.to_string())))
    }
}

/// Client address and user agent.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta(pub ClientInfo);

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(ClientInfo {
            ip_address: client_ip(&parts.headers, &parts.extensions).map(|ip| ip.to_string()),
            user_agent: parts
                .headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
        }))
    }
}

/// Client IP from proxy headers, falling back to the socket address.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|ip| ip.trim().parse().ok())
        })
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn caller(scopes: &[&str]) -> Caller {
        Caller {
            id: "u1".to_string(),
            name: None,
            email: None,
            scopes: scopes.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_admin_scopes() {
        assert!(caller(&["admin"]).is_admin());
        assert!(caller(&["read", "comments:moderate"]).is_admin());
        assert!(!caller(&["comments:write"]).is_admin());
        assert!(!caller(&[]).is_admin());
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));

        assert_eq!(
            client_ip(&headers, &extensions),
            Some("203.0.113.7".parse().unwrap())
        );

        headers.remove("x-forwarded-for");
        assert_eq!(client_ip(&headers, &extensions), Some("10.0.0.2".parse().unwrap()));

        assert_eq!(
            client_ip(&HeaderMap::new(), &extensions),
            Some("127.0.0.1".parse().unwrap())
        );
        assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), None);
    }
}
