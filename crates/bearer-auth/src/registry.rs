//! Named strategy registration and per-route guards
//!
//! Strategies are registered once at startup under a name. Routes opt in by
//! asking for a `Guard` over one or more names. A guard tries its strategies
//! in order: `MissingHeader` means "not offered a credential" and defers to
//! the next strategy, every other outcome is final.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::debug;

use crate::authenticator::{AuthResult, BearerAuthenticator, StrategyConfig};
use crate::error::{Error, Result};
use crate::metrics;

/// Registered strategies keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Strategies {
    by_name: HashMap<Arc<str>, Arc<BearerAuthenticator>>,
}

impl Strategies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy; fails on a missing resolver or a taken name.
    pub fn register(&mut self, name: impl Into<String>, config: StrategyConfig) -> Result<()> {
        let name: String = name.into();
        if self.by_name.contains_key(name.as_str()) {
            return Err(Error::DuplicateStrategy(name));
        }
        let authenticator = BearerAuthenticator::new(config)?;
        debug!(strategy = %name, base64 = authenticator.is_base64(), "registered bearer strategy");
        self.by_name.insert(Arc::from(name), Arc::new(authenticator));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<BearerAuthenticator>> {
        self.by_name.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Build a guard trying `names` in order.
    pub fn guard<S: AsRef<str>>(&self, names: &[S]) -> Result<Guard> {
        if names.is_empty() {
            return Err(Error::NoStrategies);
        }
        let chain = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.by_name
                    .get_key_value(name)
                    .map(|(name, authenticator)| (name.clone(), authenticator.clone()))
                    .ok_or_else(|| Error::UnknownStrategy(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Guard {
            chain: chain.into(),
        })
    }
}

/// Result of running a guard, with the strategy that decided it.
#[derive(Debug)]
pub struct Attempt {
    pub strategy: Arc<str>,
    pub result: AuthResult,
}

/// Ordered strategies protecting a route. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Guard {
    chain: Arc<[(Arc<str>, Arc<BearerAuthenticator>)]>,
}

impl Guard {
    pub fn strategies(&self) -> impl Iterator<Item = &str> {
        self.chain.iter().map(|(name, _)| &**name)
    }

    /// Run the strategies until one reports something other than
    /// `MissingHeader`. If none does, the first strategy's `MissingHeader`
    /// is the answer.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Attempt {
        for (name, authenticator) in self.chain.iter() {
            let result = authenticator.authenticate(headers).await;
            debug!(strategy = %name, outcome = result.outcome(), "bearer strategy evaluated");
            metrics::record_attempt(name, result.outcome());

            if !matches!(result, AuthResult::MissingHeader) {
                return Attempt {
                    strategy: name.clone(),
                    result,
                };
            }
        }

        Attempt {
            strategy: self.chain[0].0.clone(),
            result: AuthResult::MissingHeader,
        }
    }
}
