// src/watch/hash.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the blake3 hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs.open_read(path)?;
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

/// Last known content hash per source file.
///
/// Used when `watch.use_hash` is on to drop events for files that were
/// rewritten with identical bytes.
#[derive(Debug)]
pub struct ContentHashes {
    fs: Arc<dyn FileSystem>,
    hashes: HashMap<PathBuf, String>,
}

impl ContentHashes {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hashes: HashMap::new(),
        }
    }

    /// Record the current content of `path` and report whether it differs
    /// from what we saw last time.
    ///
    /// A file seen for the first time, or one that can no longer be read
    /// (deleted, renamed away), counts as changed.
    pub fn changed(&mut self, path: &Path) -> bool {
        match compute_file_hash(self.fs.as_ref(), path) {
            Ok(hash) => {
                let previous = self.hashes.insert(path.to_path_buf(), hash.clone());
                let changed = previous.as_deref() != Some(hash.as_str());
                if !changed {
                    debug!(?path, "content hash unchanged");
                }
                changed
            }
            Err(err) => {
                debug!(?path, error = %err, "could not hash file; treating as changed");
                self.hashes.remove(path);
                true
            }
        }
    }
}
