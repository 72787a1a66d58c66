//! Configuration types and loading
//!
//! Config precedence: `--config` CLI arg > `CONFIG_PATH` env var > default
//! file name. Tokens never live in this file; each strategy points at its
//! own credentials file, resolved relative to the config file's directory.

use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub strategies: Vec<StrategyEntry>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// A named bearer strategy and where its credentials come from
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyEntry {
    pub name: String,
    /// Bearer value is base64 `identifier:token`
    #[serde(default)]
    pub base64: bool,
    pub credentials_file: PathBuf,
}

/// A protected path and the strategies tried for it, in order
#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    pub strategies: Vec<String>,
}

/// Paths served by the gateway itself, never behind a strategy.
pub const RESERVED_PATHS: &[&str] = &["/health", "/metrics"];

fn default_max_connections() -> usize {
    1000
}

/// Check a route path against the router's syntax: literal segments, or
/// whole-segment `{name}` captures with an optional final `{*rest}`.
///
/// Returns the path with capture names erased, so routes that differ only
/// in capture names compare equal.
fn route_shape(path: &str) -> Result<String, String> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err("must start with '/'".into());
    };
    if RESERVED_PATHS.contains(&path) {
        return Err("is reserved for the gateway".into());
    }

    let segments: Vec<&str> = rest.split('/').collect();
    let mut shape = String::with_capacity(path.len());
    for (index, segment) in segments.iter().enumerate() {
        shape.push('/');
        if segment.starts_with(':') {
            return Err(format!("uses ':' capture syntax in {segment}, use {{name}}"));
        }
        if !segment.contains(['{', '}']) {
            shape.push_str(segment);
            continue;
        }

        let name = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| format!("has a malformed capture segment: {segment}"))?;
        let (wildcard, name) = match name.strip_prefix('*') {
            Some(name) => (true, name),
            None => (false, name),
        };
        let valid_name = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(format!("has an invalid capture name: {segment}"));
        }
        if wildcard && index + 1 != segments.len() {
            return Err(format!("has a wildcard before the last segment: {segment}"));
        }
        shape.push_str(if wildcard { "{*}" } else { "{}" });
    }
    Ok(shape)
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.strategies.is_empty() {
            return Err(common::Error::Config(
                "at least one [[strategies]] entry is required".into(),
            ));
        }

        let mut names = HashSet::new();
        for strategy in &config.strategies {
            if strategy.name.trim().is_empty() {
                return Err(common::Error::Config("strategy name must not be empty".into()));
            }
            if !names.insert(strategy.name.as_str()) {
                return Err(common::Error::Config(format!(
                    "duplicate strategy name: {}",
                    strategy.name
                )));
            }
        }

        let mut paths = HashSet::new();
        for route in &config.routes {
            let shape = route_shape(&route.path).map_err(|reason| {
                common::Error::Config(format!("route path {} {reason}", route.path))
            })?;
            if !paths.insert(shape) {
                return Err(common::Error::Config(format!(
                    "duplicate route path: {}",
                    route.path
                )));
            }
            if route.strategies.is_empty() {
                return Err(common::Error::Config(format!(
                    "route {} must name at least one strategy",
                    route.path
                )));
            }
            if let Some(unknown) = route
                .strategies
                .iter()
                .find(|name| !names.contains(name.as_str()))
            {
                return Err(common::Error::Config(format!(
                    "route {} uses unknown strategy: {unknown}",
                    route.path
                )));
            }
        }

        // Relative credential paths are anchored at the config file
        if let Some(dir) = path.parent() {
            for strategy in &mut config.strategies {
                if strategy.credentials_file.is_relative() {
                    strategy.credentials_file = dir.join(&strategy.credentials_file);
                }
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("bearer-gateway.toml")
    }
}
