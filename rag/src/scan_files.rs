use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::Config;

/// Text documents under `base` that match the configured extensions.
///
/// Results are sorted by path so repeated indexing yields stable chunk ids.
pub fn scan_files(cfg: &Config, base: &Path) -> Vec<(PathBuf, String)> {
    let mut results = Vec::new();

    let walker = WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.depth() == 0 || !cfg.exclude_dirs.iter().any(|d| d == &name)
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_extension(path, &cfg.include_exts) {
            continue;
        }
        if let Ok(meta) = fs::metadata(path) {
            if meta.len() > cfg.max_file_bytes {
                debug!(path = %path.display(), bytes = meta.len(), "skipping oversized file");
                continue;
            }
        }
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        results.push((path.to_path_buf(), text));
    }

    results
}

fn has_extension(path: &Path, exts: &[String]) -> bool {
    let lower = path.to_string_lossy().to_lowercase();
    exts.iter().any(|ext| lower.ends_with(&ext.to_lowercase()))
}
