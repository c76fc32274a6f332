//! Runtime configuration file parsing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::runner::ds::type_name::DEFAULT_UNIT_EXTENSION;

/// Environment variable with extra search directories, separated like `PATH`.
pub const ENV_CLASSLOADER_PATH: &str = "CLASSLOADER_PATH";

/// Each script-level call costs several Rust frames, so this has to stay well inside
/// a 2 MiB thread stack.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

lazy_static! {
    /// `CLASSLOADER_PATH`, read once per process.
    static ref ENV_SEARCH_PATH: Vec<PathBuf> = match std::env::var_os(ENV_CLASSLOADER_PATH) {
        Some(value) => std::env::split_paths(&value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect(),
        None => Vec::new(),
    };
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Where unit files are looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directories searched in order.
    pub search_path: Vec<PathBuf>,
    /// Unit file extension, without the dot.
    pub extension: String,
    /// Append the directories from `CLASSLOADER_PATH`.
    pub use_env_path: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            search_path: Vec::new(),
            extension: DEFAULT_UNIT_EXTENSION.to_string(),
            use_env_path: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Nested calls allowed before a call fails with a deep recursion error.
    pub max_call_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Complete runtime configuration.
///
/// Expected format:
/// ```toml
/// [loader]
/// search_path = ["lib", "vendor/lib"]
/// extension = "unit"
/// use_env_path = true
///
/// [runtime]
/// max_call_depth = 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub loader: LoaderConfig,
    pub runtime: LimitsConfig,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file. Relative search directories are resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            config.loader.search_path = config
                .loader
                .search_path
                .into_iter()
                .map(|dir| if dir.is_relative() { base.join(dir) } else { dir })
                .collect();
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.loader.extension;
        if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "loader.extension must be a bare extension, got {:?}",
                ext
            )));
        }
        if self.runtime.max_call_depth == 0 {
            return Err(ConfigError::ValidationError(
                "runtime.max_call_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Add a directory to the end of the search path.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.loader.search_path.push(dir.into());
        self
    }

    /// Add a directory to the front of the search path (as `-I` does).
    pub fn with_leading_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.loader.search_path.insert(0, dir.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.loader.extension = extension.into();
        self
    }

    pub fn with_env_path(mut self, enabled: bool) -> Self {
        self.loader.use_env_path = enabled;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.runtime.max_call_depth = depth;
        self
    }

    /// Configured directories followed by `CLASSLOADER_PATH` when enabled.
    pub fn effective_search_path(&self) -> Vec<PathBuf> {
        let mut path = self.loader.search_path.clone();
        if self.loader.use_env_path {
            for dir in ENV_SEARCH_PATH.iter() {
                if !path.contains(dir) {
                    path.push(dir.clone());
                }
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = RuntimeConfig::parse("").unwrap();
        assert!(config.loader.search_path.is_empty());
        assert_eq!(config.loader.extension, "unit");
        assert_eq!(config.runtime.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
    }

    #[test]
    fn test_parse_full_config() {
        let config = RuntimeConfig::parse(
            r#"
[loader]
search_path = ["lib", "/opt/units"]
extension = "cls"
use_env_path = false

[runtime]
max_call_depth = 32
"#,
        )
        .unwrap();
        assert_eq!(
            config.loader.search_path,
            vec![PathBuf::from("lib"), PathBuf::from("/opt/units")]
        );
        assert_eq!(config.loader.extension, "cls");
        assert!(!config.loader.use_env_path);
        assert_eq!(config.runtime.max_call_depth, 32);
        assert_eq!(config.effective_search_path(), config.loader.search_path);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            RuntimeConfig::parse("[loader]\nextension = \".unit\"\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            RuntimeConfig::parse("[runtime]\nmax_call_depth = 0\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            RuntimeConfig::parse("[loader\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_resolves_relative_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classloader.toml");
        fs::write(&path, "[loader]\nsearch_path = [\"lib\"]\n").unwrap();
        let config = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config.loader.search_path, vec![dir.path().join("lib")]);

        assert!(matches!(
            RuntimeConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::NotFound(_))
        ));
    }
}
