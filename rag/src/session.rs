//! Per-session state behind the interactive front end.
//!
//! The session moves through
//! `Uninitialized -> AwaitingKey | Ready -> Querying -> Displaying -> Ready`.
//! `AwaitingKey` halts everything until a key is supplied; `Unavailable`
//! means the index could not be opened and stays until the user acts.
//! Blocking work (loading, answering) is done by the caller; the session
//! only records its outcome.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::credential::{provision_key, Credential, KeyOrigin};
use crate::error::{RagError, Result};
use crate::store::create_index_dir;
use crate::Assistant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    AwaitingKey,
    Ready,
    Querying,
    Displaying,
    Unavailable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Banner {
    Success(String),
    Warning(String),
    Error(String),
}

impl Banner {
    pub fn text(&self) -> &str {
        match self {
            Banner::Success(t) | Banner::Warning(t) | Banner::Error(t) => t,
        }
    }
}

pub struct Session {
    cfg: Config,
    phase: Phase,
    credential: Option<Credential>,
    key_notice: Option<Banner>,
    banner: Option<Banner>,
    assistant: Option<Arc<Assistant>>,
    streaming: String,
    answer: Option<String>,
    last_query: Option<String>,
}

impl Session {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            phase: Phase::Uninitialized,
            credential: None,
            key_notice: None,
            banner: None,
            assistant: None,
            streaming: String::new(),
            answer: None,
            last_query: None,
        }
    }

    /// Runs the key provisioner. Returns the credential the caller should
    /// load the index with, or `None` when the session has to wait for a key.
    pub fn provide_key(&mut self, entered: &str) -> Option<Credential> {
        if self.is_busy() {
            return None;
        }
        self.assistant = None;
        match provision_key(&self.cfg, entered) {
            Ok((credential, origin)) => {
                self.key_notice = (origin == KeyOrigin::Environment)
                    .then(|| Banner::Success("API Key loaded from .env file".to_string()));
                self.credential = Some(credential.clone());
                self.banner = None;
                self.phase = Phase::Uninitialized;
                Some(credential)
            }
            Err(err) => {
                warn!(error = %err, "session waiting for API key");
                self.credential = None;
                self.key_notice = None;
                self.banner = Some(Banner::Warning(
                    "Please enter your Groq API key in the sidebar to continue.".to_string(),
                ));
                self.phase = Phase::AwaitingKey;
                None
            }
        }
    }

    /// Credential to reload the index with after a user action.
    pub fn reload(&mut self) -> Option<Credential> {
        if self.is_busy() || self.phase == Phase::AwaitingKey {
            return None;
        }
        let credential = self.credential.clone()?;
        self.assistant = None;
        self.phase = Phase::Uninitialized;
        Some(credential)
    }

    pub fn index_loaded(&mut self, result: Result<Assistant>) {
        if self.phase != Phase::Uninitialized {
            return;
        }
        match result {
            Ok(assistant) => {
                info!(path = %self.store_path().display(), "session ready");
                self.assistant = Some(Arc::new(assistant));
                self.phase = Phase::Ready;
            }
            Err(err) => {
                error!(error = %err, "index load failed");
                let text = match &err {
                    RagError::IndexNotFound(_) => err.to_string(),
                    _ => format!("Initialization error: {}", err),
                };
                self.banner = Some(Banner::Error(text));
                self.phase = Phase::Unavailable;
            }
        }
    }

    /// Key provisioning and index loading in one synchronous step.
    pub fn initialize_with<L>(&mut self, entered: &str, loader: L) -> Phase
    where
        L: FnOnce(&Config, Credential) -> Result<Assistant>,
    {
        if let Some(credential) = self.provide_key(entered) {
            let result = loader(&self.cfg, credential);
            self.index_loaded(result);
        }
        self.phase
    }

    pub fn can_create_directory(&self) -> bool {
        self.phase == Phase::Unavailable
            && self.cfg.index_source.is_local()
            && !self.store_path().exists()
    }

    /// Corpus indexing embeds through the local model service, so it needs a
    /// key-holding, idle session and a local index directory to write into.
    pub fn can_index(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::Unavailable)
            && self.credential.is_some()
            && self.cfg.index_source.is_local()
    }

    /// Creates the missing local index directory. The directory stays empty.
    pub fn create_directory(&mut self) -> Result<()> {
        if !self.can_create_directory() {
            return Ok(());
        }
        let dir = self.store_path();
        match create_index_dir(&dir) {
            Ok(()) => {
                self.banner = Some(Banner::Success("Directory created!".to_string()));
                Ok(())
            }
            Err(err) => {
                self.banner = Some(Banner::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Accepts a query when the session is ready. Returns the assistant and
    /// query text the caller should answer with.
    pub fn submit(&mut self, query: &str) -> Option<(Arc<Assistant>, String)> {
        if self.phase != Phase::Ready {
            return None;
        }
        if query.trim().is_empty() {
            self.banner = Some(Banner::Warning("Please enter a query.".to_string()));
            return None;
        }
        let assistant = self.assistant.clone()?;
        self.answer = None;
        self.streaming.clear();
        self.banner = None;
        self.last_query = Some(query.to_string());
        self.phase = Phase::Querying;
        Some((assistant, query.to_string()))
    }

    pub fn push_fragment(&mut self, fragment: &str) {
        if !self.is_busy() {
            return;
        }
        self.phase = Phase::Displaying;
        self.streaming.push_str(fragment);
    }

    pub fn finish(&mut self, result: Result<String>) {
        if !self.is_busy() {
            return;
        }
        match result {
            Ok(answer) => {
                if answer != self.streaming {
                    warn!(
                        streamed = self.streaming.len(),
                        returned = answer.len(),
                        "streamed text differs from returned answer"
                    );
                }
                if !answer.is_empty() {
                    self.banner =
                        Some(Banner::Success("Query processed successfully!".to_string()));
                }
                self.answer = Some(answer);
            }
            Err(err) => {
                error!(error = %err, "query failed");
                self.answer = None;
                self.banner = Some(Banner::Error(format!(
                    "Error during query processing: {}",
                    err
                )));
            }
        }
        self.streaming.clear();
        self.phase = Phase::Ready;
    }

    /// Submits `query` and answers it on the current thread.
    pub fn ask<F>(&mut self, query: &str, mut on_fragment: F) -> Option<&str>
    where
        F: FnMut(&str),
    {
        let (assistant, query) = self.submit(query)?;
        let result = assistant.answer(&query, |fragment| {
            self.push_fragment(fragment);
            on_fragment(fragment);
        });
        self.finish(result);
        self.answer()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Querying | Phase::Displaying)
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn key_notice(&self) -> Option<&Banner> {
        self.key_notice.as_ref()
    }

    pub fn key_loaded(&self) -> bool {
        self.credential.is_some()
    }

    pub fn store_path(&self) -> PathBuf {
        self.cfg.index_source.store_path().to_path_buf()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Text to show in the answer area: the growing stream while a query
    /// runs, the final answer afterwards.
    pub fn display_text(&self) -> Option<&str> {
        if self.is_busy() {
            Some(self.streaming.as_str())
        } else {
            self.answer.as_deref()
        }
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }
}
