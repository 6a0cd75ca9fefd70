//! # Configuration
//!
//! Optional TOML file, selected by `--config` or `BASHO_CONFIG`.
//! A missing file means defaults.
//!
//! ```toml
//! shell = "bash"
//! shell_args = ["-c"]
//! max_module_size = 1048576
//! print_errors = true
//! ignore_errors = false
//! ```

use basho_core::BashoError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BASHO_CONFIG";

/// Default cap on the size of an imported module (16 MiB).
pub const DEFAULT_MAX_MODULE_SIZE: u64 = 16 * 1024 * 1024;

/// Settings for the basho binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BashoConfig {
    /// Program used to run shell stages.
    pub shell: String,

    /// Arguments placed before the command text.
    pub shell_args: Vec<String>,

    /// Largest module file an import may read, in bytes.
    pub max_module_size: u64,

    /// Print error items and keep going.
    pub print_errors: bool,

    /// Skip error items silently.
    pub ignore_errors: bool,
}

impl Default for BashoConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            shell_args: vec!["-c".to_string()],
            max_module_size: DEFAULT_MAX_MODULE_SIZE,
            print_errors: false,
            ignore_errors: false,
        }
    }
}

impl BashoConfig {
    /// Load from `explicit`, else from `BASHO_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, BashoError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(value) if !value.is_empty() => PathBuf::from(value),
                _ => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, BashoError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BashoError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)
            .map_err(|e| BashoError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self, BashoError> {
        toml::from_str(content).map_err(|e| BashoError::Config(e.to_string()))
    }
}
