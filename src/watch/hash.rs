// src/watch/hash.rs

//! Content hashing for `use_hash = true` watch rules.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fileset::relative_slash_path;
use crate::fs::FileSystem;
use crate::types::TaskName;
use crate::watch::patterns::{collect_matching_files, WatchRule};

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash everything a rule watches: relative path and content of each file,
/// in path order, so adding, removing or renaming a file changes the hash.
pub fn compute_rule_hash(fs: &dyn FileSystem, root: &Path, rule: &WatchRule) -> Result<String> {
    let mut hasher = Hasher::new();
    for path in collect_matching_files(fs, root, rule)? {
        let rel = relative_slash_path(root, &path).unwrap_or_default();
        hasher.update(rel.as_bytes());
        hasher.update(compute_file_hash(fs, &path)?.as_bytes());
    }
    let hash = hasher.finalize().to_hex().to_string();
    debug!(task = %rule.task(), hash = %hash, "computed aggregate hash");
    Ok(hash)
}

/// Last seen aggregate hash per task, in memory.
#[derive(Debug, Default)]
pub struct HashMemo {
    map: HashMap<TaskName, String>,
}

impl HashMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` for `task` and report whether it differs from the last
    /// one. A task with no previous hash counts as changed.
    pub fn record(&mut self, task: &str, hash: String) -> bool {
        match self.map.insert(task.to_string(), hash) {
            Some(previous) => {
                let changed = self.map.get(task) != Some(&previous);
                if !changed {
                    info!(task = %task, "watched content unchanged; skipping trigger");
                }
                changed
            }
            None => true,
        }
    }

    /// Prime the memo without reporting a change.
    pub fn seed(&mut self, task: &str, hash: String) {
        self.map.insert(task.to_string(), hash);
    }
}
