//! The request as blueprints see it
//!
//! Handlers never look at the raw axum request: it is flattened once into a
//! [`BlueprintRequest`] holding route parameters, the parsed query string, the
//! JSON payload and the caller's claims.

use crate::core::auth::AuthProvider;
use crate::core::error::{BlueprintError, BlueprintResult};
use crate::core::value::get_path;
use axum::body::Body;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::{Method, Request};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Largest payload a blueprint route accepts
const MAX_PAYLOAD_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct BlueprintRequest {
    pub method: Method,
    pub path: String,
    /// Route parameters (`{id}`, `{childId}`, ...)
    pub params: HashMap<String, String>,
    /// Query string; later occurrences of a key win
    pub query: Map<String, Value>,
    pub payload: Option<Value>,
    /// Claims of the authenticated caller
    pub credentials: Option<Value>,
}

impl BlueprintRequest {
    /// Flatten an axum request
    pub async fn from_request(
        request: Request<Body>,
        auth: &dyn AuthProvider,
    ) -> BlueprintResult<Self> {
        let (mut parts, body) = request.into_parts();

        // Routes without parameters have nothing to extract
        let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();

        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|e| BlueprintError::bad_request(e.body_text()))?;
        let query = pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();

        let credentials = auth
            .credentials(&parts)
            .await
            .map_err(|e| BlueprintError::internal(format!("credentials: {}", e)))?;

        let bytes = axum::body::to_bytes(body, MAX_PAYLOAD_BYTES)
            .await
            .map_err(|e| BlueprintError::bad_request(format!("unreadable body: {}", e)))?;
        let payload = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(
                serde_json::from_slice(&bytes)
                    .map_err(|e| BlueprintError::bad_request(format!("invalid JSON payload: {}", e)))?,
            )
        };

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            params,
            query,
            payload,
            credentials,
        })
    }

    /// Look up a claim by dotted path (`animal.id`)
    pub fn claim(&self, path: &str) -> Option<&Value> {
        get_path(self.credentials.as_ref()?, path)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_str(&self, key: &str) -> Option<&str> {
        self.query.get(key).and_then(Value::as_str)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}
