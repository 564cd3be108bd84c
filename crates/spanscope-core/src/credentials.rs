//! Read token discovery
//!
//! The token comes from the configured environment variable, or from the
//! first `.env` file in the search order that defines it. `.env` files are
//! parsed, never loaded into the process environment.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::CredentialConfig;
use crate::error::{Error, Result};

/// A backend read token
#[derive(Clone, PartialEq, Eq)]
pub struct ReadToken(String);

impl ReadToken {
    /// Wrap a token value
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for request headers
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ReadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadToken(***)")
    }
}

/// `.env` files searched, in priority order
pub fn search_paths(config: &CredentialConfig) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".env")];
    if let Some(dirs) = directories::BaseDirs::new() {
        paths.push(dirs.home_dir().join(".env"));
    }
    paths.extend(config.extra_paths.iter().cloned());
    paths
}

/// Find the read token, or `None` when no location defines it
pub fn load_credential(config: &CredentialConfig) -> Option<ReadToken> {
    lookup(config, &search_paths(config))
}

/// Like [`load_credential`], but absence is an error
pub fn require_credential(config: &CredentialConfig) -> Result<ReadToken> {
    require_in(config, &search_paths(config))
}

fn lookup(config: &CredentialConfig, paths: &[PathBuf]) -> Option<ReadToken> {
    if let Some(token) = std::env::var(&config.env_var)
        .ok()
        .filter(|t| !t.trim().is_empty())
    {
        debug!(var = %config.env_var, "Using read token from environment");
        return Some(ReadToken(token));
    }

    find_in_files(&config.env_var, paths)
}

fn require_in(config: &CredentialConfig, paths: &[PathBuf]) -> Result<ReadToken> {
    lookup(config, paths).ok_or_else(|| {
        Error::MissingCredential(format!(
            "{} is not set and no .env file in the search path defines it",
            config.env_var
        ))
    })
}

/// Search `.env` files in order for `key`
pub fn find_in_files(key: &str, paths: &[PathBuf]) -> Option<ReadToken> {
    paths.iter().find_map(|path| read_key(path, key))
}

fn read_key(path: &Path, key: &str) -> Option<ReadToken> {
    if !path.is_file() {
        return None;
    }

    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable .env file");
            return None;
        }
    };

    for entry in entries {
        match entry {
            Ok((name, value)) if name == key && !value.trim().is_empty() => {
                debug!(path = %path.display(), "Using read token from .env file");
                return Some(ReadToken(value));
            }
            Ok(_) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed .env line");
            }
        }
    }

    None
}
