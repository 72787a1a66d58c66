//! Credential resolver capability
//!
//! The authenticator never stores credentials. It hands each lookup to an
//! injected `Resolver` and interprets the answer:
//!
//! - `Err(_)` is an internal failure, whatever else the resolver knew
//! - `Ok(None)` means the identifier is unknown
//! - `Ok(Some(credentials))` authenticates the request
//!
//! Uses `Pin<Box<dyn Future>>` return types so resolvers can be shared as
//! `Arc<dyn Resolver>` across strategies and requests.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::context::Credentials;

/// What a resolver is asked to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Plain mode: the whole bearer value. Base64 mode: the part before `:`.
    pub identifier: String,
    /// Base64 mode only: the part after `:`.
    pub token: Option<String>,
}

impl Lookup {
    pub fn plain(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            token: None,
        }
    }

    pub fn with_token(identifier: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            token: Some(token.into()),
        }
    }
}

/// Opaque failure raised by a resolver (backing store down, bug, ...).
///
/// Forwarded untouched for logging; clients only ever see the generic
/// internal error message.
#[derive(Debug, Error)]
#[error("credential lookup failed: {0}")]
pub struct ResolveError(#[source] Box<dyn StdError + Send + Sync>);

impl ResolveError {
    pub fn new(cause: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(cause.into())
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

/// Outcome of a single lookup.
pub type Resolution = Result<Option<Credentials>, ResolveError>;

/// Normalise a callback-style `(error, credentials)` answer.
///
/// An error always wins, even when credentials were supplied alongside it.
pub fn from_callback(error: Option<ResolveError>, credentials: Option<Credentials>) -> Resolution {
    match error {
        Some(error) => Err(error),
        None => Ok(credentials),
    }
}

/// Maps a bearer identifier (and optional token) to credentials.
pub trait Resolver: Send + Sync {
    fn resolve(&self, lookup: Lookup) -> Pin<Box<dyn Future<Output = Resolution> + Send + '_>>;
}

/// Resolver backed by an async closure.
pub struct FnResolver<F>(F);

/// Build a resolver from `Fn(Lookup) -> impl Future<Output = Resolution>`.
pub fn from_fn<F, Fut>(f: F) -> FnResolver<F>
where
    F: Fn(Lookup) -> Fut + Send + Sync,
    Fut: Future<Output = Resolution> + Send + 'static,
{
    FnResolver(f)
}

impl<F, Fut> Resolver for FnResolver<F>
where
    F: Fn(Lookup) -> Fut + Send + Sync,
    Fut: Future<Output = Resolution> + Send + 'static,
{
    fn resolve(&self, lookup: Lookup) -> Pin<Box<dyn Future<Output = Resolution> + Send + '_>> {
        Box::pin((self.0)(lookup))
    }
}

/// Resolver backed by a synchronous callback answering `(error, credentials)`.
pub struct CallbackResolver<F>(F);

/// Build a resolver from a callback-style lookup; see `from_callback` for
/// how the pair is interpreted.
///
/// ```
/// use bearer_auth::resolver::{self, Lookup, Resolver};
/// use bearer_auth::Credentials;
///
/// let resolver = resolver::from_callback_fn(|lookup: &Lookup| {
///     if lookup.identifier == "abc" {
///         (None, Some(Credentials::new(serde_json::json!({"user": "alice"}))))
///     } else {
///         (None, None)
///     }
/// });
/// # let _: &dyn Resolver = &resolver;
/// ```
pub fn from_callback_fn<F>(f: F) -> CallbackResolver<F>
where
    F: Fn(&Lookup) -> (Option<ResolveError>, Option<Credentials>) + Send + Sync,
{
    CallbackResolver(f)
}

impl<F> Resolver for CallbackResolver<F>
where
    F: Fn(&Lookup) -> (Option<ResolveError>, Option<Credentials>) + Send + Sync,
{
    fn resolve(&self, lookup: Lookup) -> Pin<Box<dyn Future<Output = Resolution> + Send + '_>> {
        let (error, credentials) = (self.0)(&lookup);
        Box::pin(async move { from_callback(error, credentials) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_wins_over_credentials() {
        let resolution = from_callback(
            Some(ResolveError::new("boom")),
            Some(Credentials::from(json!({"token": "error"}))),
        );
        let err = resolution.unwrap_err();
        assert_eq!(err.cause().to_string(), "boom");
    }

    #[test]
    fn no_error_passes_credentials_through() {
        let credentials = Credentials::from(json!({"token": "abc"}));
        let resolution = from_callback(None, Some(credentials.clone()));
        assert_eq!(resolution.unwrap(), Some(credentials));

        assert_eq!(from_callback(None, None).unwrap(), None);
    }

    #[test]
    fn resolve_error_display_and_source() {
        let err = ResolveError::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "store unreachable",
        ));
        assert_eq!(
            err.to_string(),
            "credential lookup failed: store unreachable"
        );
        assert!(StdError::source(&err).is_some());
    }

    #[tokio::test]
    async fn fn_resolver_receives_lookup() {
        let resolver = from_fn(|lookup: Lookup| async move {
            Ok(Some(Credentials::from(json!({
                "identifier": lookup.identifier,
                "token": lookup.token,
            }))))
        });

        let credentials = resolver
            .resolve(Lookup::with_token("werxhqb98", "secret-token"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(credentials.get("identifier").unwrap(), "werxhqb98");
        assert_eq!(credentials.get("token").unwrap(), "secret-token");

        let credentials = resolver
            .resolve(Lookup::plain("abc"))
            .await
            .unwrap()
            .unwrap();
        assert!(credentials.get("token").unwrap().is_null());
    }

    #[tokio::test]
    async fn callback_resolver_prefers_error() {
        let resolver = from_callback_fn(|lookup: &Lookup| match lookup.identifier.as_str() {
            "abc" => (None, Some(Credentials::from(json!({"user": "alice"})))),
            "error" => (
                Some(ResolveError::new("store unreachable")),
                Some(Credentials::from(json!({"user": "ignored"}))),
            ),
            _ => (None, None),
        });

        let credentials = resolver.resolve(Lookup::plain("abc")).await.unwrap();
        assert_eq!(credentials.unwrap().get("user").unwrap(), "alice");

        assert!(resolver.resolve(Lookup::plain("nobody")).await.unwrap().is_none());

        let err = resolver.resolve(Lookup::plain("error")).await.unwrap_err();
        assert_eq!(err.cause().to_string(), "store unreachable");
    }
}
