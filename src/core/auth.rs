//! Credential extraction
//!
//! The authentication scheme itself lives outside blueprints. An [`AuthProvider`]
//! only has to turn request parts into a claims object (or nothing, for anonymous
//! callers). Ownership and act-as-user options read claims by dotted path, e.g.
//! `animal.id`.

use anyhow::Result;
use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde_json::Value;
use std::collections::HashMap;

/// Trait for auth providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Extract the caller's claims; `None` for anonymous requests
    async fn credentials(&self, parts: &Parts) -> Result<Option<Value>>;
}

/// Default no-auth provider (for development)
pub struct NoAuthProvider;

#[async_trait]
impl AuthProvider for NoAuthProvider {
    async fn credentials(&self, _parts: &Parts) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// Fixed token → claims table
///
/// Reads `Authorization: <scheme> <token>`. When a scheme is configured it must
/// match (case-insensitively); unknown tokens are anonymous.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthProvider {
    scheme: Option<String>,
    tokens: HashMap<String, Value>,
}

impl StaticTokenAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept this scheme (e.g. `Bearer`)
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>, claims: Value) -> Self {
        self.tokens.insert(token.into(), claims);
        self
    }

    fn token<'h>(&self, header: &'h str) -> Option<&'h str> {
        let mut parts = header.split_whitespace();
        let (scheme, token) = (parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        match &self.scheme {
            Some(expected) if !expected.eq_ignore_ascii_case(scheme) => None,
            _ => Some(token),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuthProvider {
    async fn credentials(&self, parts: &Parts) -> Result<Option<Value>> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        // Undecodable credentials are as good as none
        let Ok(header) = header.to_str() else {
            tracing::debug!("ignoring non-ASCII authorization header");
            return Ok(None);
        };

        Ok(self
            .token(header)
            .and_then(|token| self.tokens.get(token))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/zoo");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn provider() -> StaticTokenAuthProvider {
        StaticTokenAuthProvider::new()
            .with_token("Doggie", json!({ "animal": { "id": 1 } }))
            .with_token("Kitty", json!({ "animal": { "id": 2 } }))
    }

    #[tokio::test]
    async fn test_no_auth_provider() {
        let claims = NoAuthProvider.credentials(&parts(Some("Custom Doggie"))).await.unwrap();
        assert!(claims.is_none());
    }

    #[tokio::test]
    async fn test_known_token() {
        let claims = provider()
            .credentials(&parts(Some("Custom Doggie")))
            .await
            .unwrap();
        assert_eq!(claims, Some(json!({ "animal": { "id": 1 } })));
    }

    #[tokio::test]
    async fn test_unknown_or_malformed() {
        let provider = provider();
        assert!(provider.credentials(&parts(None)).await.unwrap().is_none());
        assert!(provider.credentials(&parts(Some("Custom Horse"))).await.unwrap().is_none());
        assert!(provider.credentials(&parts(Some("Doggie"))).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_header_is_anonymous() {
        let mut parts = parts(None);
        parts.headers.insert(
            AUTHORIZATION,
            axum::http::HeaderValue::from_bytes(b"Custom \xe9t\xe9").unwrap(),
        );
        assert!(provider().credentials(&parts).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scheme_must_match() {
        let provider = provider().with_scheme("Bearer");
        assert!(provider.credentials(&parts(Some("Custom Kitty"))).await.unwrap().is_none());
        assert!(provider.credentials(&parts(Some("bearer Kitty"))).await.unwrap().is_some());
    }
}
