//! File-backed token store used as the bearer resolver
//!
//! Credentials file format:
//!
//! ```toml
//! [[credentials]]
//! id = "rpaxn39848xrunpaw3489ruxnpa98w4rxn"   # plain mode: the bearer token
//! [credentials.data]
//! user = "alice"
//!
//! [[credentials]]
//! id = "werxhqb98"                            # base64 mode: identifier ...
//! token = "rpaxn39848xrunpaw3489ruxnpa98w4rxn" # ... and its token
//! [credentials.data]
//! user = "bob"
//! ```
//!
//! Only SHA-256 digests of ids and tokens are kept after loading; `data` is
//! what handlers receive as credentials.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use bearer_auth::{Credentials, Lookup, Resolution, Resolver};
use common::Secret;
use serde::Deserialize;
use sha2::digest::Output;
use sha2::{Digest, Sha256};
use tracing::info;

type TokenDigest = Output<Sha256>;

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    credentials: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    id: Secret<String>,
    #[serde(default)]
    token: Option<Secret<String>>,
    #[serde(default)]
    data: toml::Table,
}

struct Stored {
    token: Option<TokenDigest>,
    credentials: Credentials,
}

/// In-memory store keyed by identifier digest.
pub struct TokenStore {
    entries: HashMap<TokenDigest, Stored>,
}

fn digest(value: &str) -> TokenDigest {
    Sha256::digest(value.as_bytes())
}

impl TokenStore {
    /// Load a credentials file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            common::Error::Config(format!(
                "failed to read credentials_file {}: {e}",
                path.display()
            ))
        })?;
        let store = Self::parse(&contents)?;
        info!(path = %path.display(), entries = store.len(), "loaded bearer credentials");
        Ok(store)
    }

    /// Parse credentials file contents.
    pub fn parse(contents: &str) -> common::Result<Self> {
        let file: CredentialsFile = toml::from_str(contents)?;

        let mut entries = HashMap::with_capacity(file.credentials.len());
        for (index, entry) in file.credentials.into_iter().enumerate() {
            if entry.id.expose().is_empty() {
                return Err(common::Error::Config(format!(
                    "credentials entry #{index} has an empty id"
                )));
            }
            let data = serde_json::to_value(&entry.data).map_err(|e| {
                common::Error::Config(format!("credentials entry #{index} data: {e}"))
            })?;
            let stored = Stored {
                token: entry.token.as_ref().map(|t| digest(t.expose())),
                credentials: Credentials::new(data),
            };
            if entries.insert(digest(entry.id.expose()), stored).is_some() {
                return Err(common::Error::Config(format!(
                    "credentials entry #{index} duplicates an earlier id"
                )));
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries with a token only match lookups presenting the same token;
    /// entries without one only match plain lookups.
    fn find(&self, lookup: &Lookup) -> Option<Credentials> {
        let stored = self.entries.get(&digest(&lookup.identifier))?;
        let matched = match (&stored.token, &lookup.token) {
            (None, None) => true,
            (Some(expected), Some(presented)) => *expected == digest(presented),
            _ => false,
        };
        matched.then(|| stored.credentials.clone())
    }
}

impl Resolver for TokenStore {
    fn resolve(&self, lookup: Lookup) -> Pin<Box<dyn Future<Output = Resolution> + Send + '_>> {
        let found = self.find(&lookup);
        Box::pin(async move { Ok(found) })
    }
}
