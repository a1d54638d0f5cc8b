use std::env;
use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{RagError, Result};

/// API key for the completion endpoint. Held in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOrigin {
    Entered,
    Environment,
}

/// Resolves the session credential.
///
/// A non-empty `entered` value wins. Otherwise the variable named by
/// `cfg.api_key_var` is looked up in the process environment and then in
/// `cfg.env_file`. No source yields [`RagError::MissingCredential`].
pub fn provision_key(cfg: &Config, entered: &str) -> Result<(Credential, KeyOrigin)> {
    if !entered.is_empty() {
        debug!("using API key from input");
        return Ok((Credential::new(entered), KeyOrigin::Entered));
    }

    if let Some(value) = lookup_key(&cfg.api_key_var, &cfg.env_file) {
        debug!(var = %cfg.api_key_var, "using API key from environment");
        return Ok((Credential::new(value), KeyOrigin::Environment));
    }

    warn!(var = %cfg.api_key_var, "no API key available");
    Err(RagError::MissingCredential {
        var: cfg.api_key_var.clone(),
    })
}

fn lookup_key(var: &str, env_file: &Path) -> Option<String> {
    if let Ok(value) = env::var(var) {
        if !value.is_empty() {
            return Some(value);
        }
    }

    let entries = dotenvy::from_path_iter(env_file).ok()?;
    entries
        .filter_map(|item| item.ok())
        .find(|(key, value)| key == var && !value.is_empty())
        .map(|(_, value)| value)
}
