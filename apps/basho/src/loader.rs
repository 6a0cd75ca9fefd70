//! # Module Loader
//!
//! Import stages read JSON files. The parsed document becomes the exports
//! bound under the alias.
//!
//! References starting with `./` or `../` resolve against the base directory
//! (the working directory by default); anything else is used as given.

use crate::config::DEFAULT_MAX_MODULE_SIZE;
use async_trait::async_trait;
use basho_core::ModuleLoader;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Loads JSON modules from disk.
#[derive(Debug, Clone)]
pub struct JsonModuleLoader {
    base: PathBuf,
    max_size: u64,
}

impl Default for JsonModuleLoader {
    fn default() -> Self {
        Self::new(PathBuf::from("."), DEFAULT_MAX_MODULE_SIZE)
    }
}

impl JsonModuleLoader {
    /// Create a loader resolving relative references against `base`.
    #[must_use]
    pub fn new(base: PathBuf, max_size: u64) -> Self {
        Self { base, max_size }
    }

    /// The path a reference points at.
    #[must_use]
    pub fn resolve(&self, reference: &str) -> PathBuf {
        if reference.starts_with("./") || reference.starts_with("../") {
            self.base.join(reference)
        } else {
            PathBuf::from(reference)
        }
    }
}

/// Canonicalize and make sure the path is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, String> {
    let canonical = path
        .canonicalize()
        .map_err(|e| format!("Invalid module path '{}': {}", path.display(), e))?;

    if !canonical.is_file() {
        return Err(format!("Path '{}' is not a regular file", path.display()));
    }

    Ok(canonical)
}

#[async_trait]
impl ModuleLoader for JsonModuleLoader {
    async fn load(&self, reference: &str) -> Result<Value, String> {
        let path = validate_file_path(&self.resolve(reference))?;

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| format!("Cannot read file metadata: {}", e))?;
        if metadata.len() > self.max_size {
            return Err(format!(
                "File size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                self.max_size
            ));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        tracing::debug!("Loaded module {}", path.display());

        serde_json::from_str(&content)
            .map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))
    }
}
