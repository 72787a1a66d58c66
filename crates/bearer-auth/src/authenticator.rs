//! Bearer authenticator
//!
//! Per-request decision, checked in a fixed order:
//! 1. `Authorization` header present with the `Bearer` scheme, else `MissingHeader`
//! 2. exactly one credential after the scheme, else `MalformedHeader`
//! 3. base64 mode only: credential decodes to `identifier:token`, else `MalformedToken`
//! 4. one resolver call: error → `InternalError`, nothing → `Invalid`,
//!    credentials → `Authenticated`
//!
//! Nothing is kept between calls; the same headers and resolver answer always
//! produce the same result.

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::warn;

use crate::context::Credentials;
use crate::error::{Error, Result};
use crate::header::{self, BearerValue, HeaderError};
use crate::rejection::Rejection;
use crate::resolver::{Lookup, ResolveError, Resolver};
use crate::token::{self, MalformedToken};

/// Registration-time settings for one bearer strategy.
#[derive(Clone, Default)]
pub struct StrategyConfig {
    /// Required; `BearerAuthenticator::new` fails without it.
    pub resolver: Option<Arc<dyn Resolver>>,
    /// Bearer value is base64 `identifier:token` instead of a raw token.
    pub base64: bool,
}

impl StrategyConfig {
    pub fn new(resolver: impl Resolver + 'static) -> Self {
        Self {
            resolver: Some(Arc::new(resolver)),
            base64: false,
        }
    }

    pub fn base64(mut self, enabled: bool) -> Self {
        self.base64 = enabled;
        self
    }
}

impl fmt::Debug for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyConfig")
            .field("resolver", &self.resolver.as_ref().map(|_| "<resolver>"))
            .field("base64", &self.base64)
            .finish()
    }
}

/// Outcome of authenticating one request.
#[derive(Debug)]
pub enum AuthResult {
    Authenticated(Credentials),
    Invalid,
    InternalError(ResolveError),
    MissingHeader,
    MalformedHeader,
    MalformedToken,
}

impl AuthResult {
    /// Stable label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthResult::Authenticated(_) => "authenticated",
            AuthResult::Invalid => "invalid",
            AuthResult::InternalError(_) => "internal_error",
            AuthResult::MissingHeader => "missing_header",
            AuthResult::MalformedHeader => "malformed_header",
            AuthResult::MalformedToken => "malformed_token",
        }
    }

    /// Credentials on success, otherwise the response to send instead.
    pub fn into_credentials(self) -> std::result::Result<Credentials, Rejection> {
        match self {
            AuthResult::Authenticated(credentials) => Ok(credentials),
            AuthResult::Invalid => Err(Rejection::Invalid),
            AuthResult::InternalError(_) => Err(Rejection::Internal),
            AuthResult::MissingHeader => Err(Rejection::MissingHeader),
            AuthResult::MalformedHeader => Err(Rejection::MalformedHeader),
            AuthResult::MalformedToken => Err(Rejection::MalformedToken),
        }
    }
}

/// Bearer strategy with its injected resolver.
pub struct BearerAuthenticator {
    resolver: Arc<dyn Resolver>,
    base64: bool,
}

impl BearerAuthenticator {
    /// Validate `config` and build the authenticator.
    pub fn new(config: StrategyConfig) -> Result<Self> {
        let resolver = config.resolver.ok_or(Error::MissingResolver)?;
        Ok(Self {
            resolver,
            base64: config.base64,
        })
    }

    pub fn is_base64(&self) -> bool {
        self.base64
    }

    /// Authenticate a request from its headers.
    ///
    /// Awaits the resolver exactly once when the header is well formed and
    /// never otherwise. No timeout is applied here.
    pub async fn authenticate(&self, headers: &HeaderMap) -> AuthResult {
        let value = match header::extract(headers) {
            Ok(value) => value,
            Err(HeaderError::Missing) => return AuthResult::MissingHeader,
            Err(HeaderError::Malformed) => return AuthResult::MalformedHeader,
        };

        let lookup = match self.lookup(value) {
            Ok(lookup) => lookup,
            Err(MalformedToken) => return AuthResult::MalformedToken,
        };

        match self.resolver.resolve(lookup).await {
            Err(cause) => {
                warn!(error = %cause, "bearer credential resolver failed");
                AuthResult::InternalError(cause)
            }
            Ok(None) => AuthResult::Invalid,
            Ok(Some(credentials)) => AuthResult::Authenticated(credentials),
        }
    }

    fn lookup(&self, value: BearerValue) -> std::result::Result<Lookup, MalformedToken> {
        if !self.base64 {
            return Ok(Lookup::plain(value.into_string()));
        }
        let parts = token::decode(value.as_str())?;
        Ok(Lookup::with_token(parts.identifier, parts.token))
    }
}

impl fmt::Debug for BearerAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthenticator")
            .field("base64", &self.base64)
            .finish_non_exhaustive()
    }
}
