//! Bearer token authentication strategy for axum
//!
//! Authenticates requests from the `Authorization: Bearer <value>` header,
//! where `<value>` is either an opaque token or, in base64 mode, a base64
//! `identifier:token` pair. Credential lookup is delegated to an injected
//! async `Resolver`; this crate stores nothing.
//!
//! Request flow:
//! 1. Host registers strategies via `Strategies::register()` at startup
//! 2. Routes opt in with `protect(router, strategies.guard(&[..])?)`
//! 3. Middleware runs `BearerAuthenticator::authenticate()` per strategy
//! 4. Success inserts `AuthContext` into request extensions for handlers
//! 5. Failure short-circuits with the matching `Rejection` response

pub mod authenticator;
pub mod context;
pub mod error;
pub mod header;
pub mod metrics;
pub mod middleware;
pub mod registry;
pub mod rejection;
pub mod resolver;
pub mod token;

pub use authenticator::{AuthResult, BearerAuthenticator, StrategyConfig};
pub use context::{AuthContext, Credentials};
pub use error::{Error, Result};
pub use middleware::protect;
pub use registry::{Attempt, Guard, Strategies};
pub use rejection::Rejection;
pub use resolver::{CallbackResolver, FnResolver, Lookup, Resolution, ResolveError, Resolver};
