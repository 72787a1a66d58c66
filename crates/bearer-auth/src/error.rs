//! Strategy configuration errors
//!
//! Raised while strategies are registered and routes are wired, never while
//! a request is being authenticated.

/// Errors from strategy registration and route guarding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bearer strategy requires a credential resolver")]
    MissingResolver,

    #[error("strategy already registered: {0}")]
    DuplicateStrategy(String),

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("route guard needs at least one strategy")]
    NoStrategies,
}

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_strategy() {
        assert_eq!(
            Error::DuplicateStrategy("bearer".into()).to_string(),
            "strategy already registered: bearer"
        );
        assert_eq!(
            Error::UnknownStrategy("bearer-base64".into()).to_string(),
            "unknown strategy: bearer-base64"
        );
        assert!(
            Error::MissingResolver.to_string().contains("resolver"),
            "got: {}",
            Error::MissingResolver
        );
    }
}
