use std::env;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

pub const API_KEY_VAR: &str = "GROQ_API_KEY";
pub const LOCAL_INDEX_DIR: &str = "Embedded_Med_books";
pub const REMOTE_INDEX_FILE: &str = "medical_index.jsonl";

pub const EMBED_MODEL: &str = "bge-large";
pub const EMBED_DEVICE: &str = "cpu";
pub const NORMALIZE_EMBEDDINGS: bool = false;
pub const TOP_K: usize = 1;

pub const CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const CHAT_MODEL: &str = "llama3-70b-8192";
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 3000;

/// Where the persisted index comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexSource {
    /// A prebuilt index directory next to the program.
    Local { dir: PathBuf },
    /// A single snapshot file fetched once from `url` into `dest`.
    Remote { url: String, dest: PathBuf },
}

impl IndexSource {
    pub fn store_path(&self) -> &Path {
        match self {
            IndexSource::Local { dir } => dir,
            IndexSource::Remote { dest, .. } => dest,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, IndexSource::Local { .. })
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_key_var: String,
    pub env_file: PathBuf,
    pub index_source: IndexSource,
    pub ollama_url: String,
    pub embed_model: String,
    pub embed_device: String,
    pub normalize_embeddings: bool,
    pub top_k: usize,
    pub chat_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub source_dir: String,
    pub include_exts: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub max_file_bytes: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key_var: API_KEY_VAR.to_string(),
            env_file: PathBuf::from(".env"),
            index_source: IndexSource::Local {
                dir: program_dir().join(LOCAL_INDEX_DIR),
            },
            ollama_url: "http://localhost:11434".to_string(),
            embed_model: EMBED_MODEL.to_string(),
            embed_device: EMBED_DEVICE.to_string(),
            normalize_embeddings: NORMALIZE_EMBEDDINGS,
            top_k: TOP_K,
            chat_url: CHAT_URL.to_string(),
            chat_model: CHAT_MODEL.to_string(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            source_dir: "./corpus".to_string(),
            include_exts: vec![".txt".to_string(), ".md".to_string()],
            exclude_dirs: [".git", "target", LOCAL_INDEX_DIR]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_bytes: 2_000_000,
            chunk_size: 1000,
            chunk_overlap: 200,
            log_file: PathBuf::from("medassist.log"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env if present; variables already in the process environment win.
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let index_source = match env::var("MED_INDEX_SOURCE")
            .unwrap_or_else(|_| "local".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "local" => IndexSource::Local {
                dir: env::var("MED_INDEX_DIR")
                    .map(|d| relative_to_program(&d))
                    .unwrap_or_else(|_| defaults.index_source.store_path().to_path_buf()),
            },
            "remote" => {
                let url = match env::var("MED_REMOTE_URL") {
                    Ok(url) if !url.trim().is_empty() => url,
                    _ => {
                        let id = env::var("MED_REMOTE_FILE_ID").map_err(|_| {
                            RagError::Config(
                                "MED_REMOTE_FILE_ID is required when MED_INDEX_SOURCE=remote"
                                    .to_string(),
                            )
                        })?;
                        drive_download_url(id.trim())
                    }
                };
                IndexSource::Remote {
                    url,
                    dest: env::var("MED_REMOTE_DEST")
                        .map(|d| relative_to_program(&d))
                        .unwrap_or_else(|_| program_dir().join(REMOTE_INDEX_FILE)),
                }
            }
            other => {
                return Err(RagError::Config(format!(
                    "MED_INDEX_SOURCE must be `local` or `remote`, got `{}`",
                    other
                )))
            }
        };

        Ok(Self {
            env_file: env::var("MED_ENV_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.env_file),
            index_source,
            ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            source_dir: env::var("MED_SOURCE_DIR").unwrap_or(defaults.source_dir),
            include_exts: env::var("MED_INCLUDE_EXTS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.include_exts),
            exclude_dirs: env::var("MED_EXCLUDE_DIRS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.exclude_dirs),
            max_file_bytes: parsed_var("MED_MAX_FILE_BYTES").unwrap_or(defaults.max_file_bytes),
            chunk_size: parsed_var("MED_CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            chunk_overlap: parsed_var("MED_CHUNK_OVERLAP").unwrap_or(defaults.chunk_overlap),
            log_file: env::var("MED_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
            ..defaults
        })
    }
}

pub fn drive_download_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", file_id)
}

/// Directory holding the running executable, or `.` when it cannot be found.
pub fn program_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn relative_to_program(value: &str) -> PathBuf {
    let path = PathBuf::from(value.trim());
    if path.is_absolute() {
        path
    } else {
        program_dir().join(path)
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
