//! Resolved credentials and the per-request authentication context

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rejection::Rejection;

/// Credentials object produced by a resolver, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(Value);

impl Credentials {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Field lookup when the credentials are a JSON object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Credentials {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Authenticated identity attached to request extensions for handlers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Name of the strategy that admitted the request
    pub strategy: Arc<str>,
    pub credentials: Credentials,
}

/// Handlers on guarded routes take `AuthContext` directly. On a route the
/// middleware never ran there is no context, which is a wiring bug: 500.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthContext>().cloned().ok_or_else(|| {
            tracing::error!("AuthContext requested on a route without bearer middleware");
            Rejection::Internal
        })
    }
}
