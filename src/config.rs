//! Cache configuration.
//!
//! User-configurable settings for the disk root, the memory tier budgets,
//! and per-request debug logging. Configuration can be created
//! programmatically or loaded from environment variables.

use std::path::{Path, PathBuf};

/// Default memory tier byte budget (64 MB).
pub const DEFAULT_MEMORY_BUDGET: usize = 64 * 1024 * 1024;

/// Default memory tier entry-count budget.
pub const DEFAULT_MAX_ENTRIES: usize = 512;

/// Configuration for the cache engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Root directory for the disk tier
    pub cache_dir: PathBuf,
    /// Memory tier byte budget
    pub memory_budget: usize,
    /// Memory tier entry-count budget
    pub max_entries: usize,
    /// Emit per-request hit/miss/production events at debug level
    pub debug_logging: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: Self::default_cache_dir(),
            memory_budget: DEFAULT_MEMORY_BUDGET,
            max_entries: DEFAULT_MAX_ENTRIES,
            debug_logging: false,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with defaults and an explicit disk root.
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self::default().with_cache_dir(cache_dir)
    }

    /// Sets the disk tier root directory.
    pub fn with_cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = path.as_ref().to_path_buf();
        self
    }

    /// Sets the memory tier byte budget in megabytes.
    pub fn with_memory_budget_mb(mut self, mb: usize) -> Self {
        self.memory_budget = mb * 1024 * 1024;
        self
    }

    /// Sets the memory tier entry-count budget.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Enables or disables per-request debug logging.
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Returns the default cache root for the current platform.
    ///
    /// - macOS: `~/Library/Caches/layer-cache`
    /// - Linux: `~/.cache/layer-cache`
    /// - Windows: `%LOCALAPPDATA%\layer-cache`
    pub fn default_cache_dir() -> PathBuf {
        if let Some(cache_dir) = dirs::cache_dir() {
            cache_dir.join("layer-cache")
        } else {
            // Fallback to a relative directory if no platform dir exists
            PathBuf::from("cache/layer-cache")
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// - `LAYER_CACHE_DIR`: disk tier root directory
    /// - `LAYER_CACHE_MEMORY_MB`: memory budget in MB (default: 64)
    /// - `LAYER_CACHE_MAX_ENTRIES`: entry-count budget (default: 512)
    /// - `LAYER_CACHE_DEBUG`: `1`/`true` to enable debug logging
    ///
    /// # Errors
    /// Returns an error if any variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LAYER_CACHE_DIR") {
            config.cache_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("LAYER_CACHE_MEMORY_MB") {
            config.memory_budget = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("LAYER_CACHE_MEMORY_MB".to_string()))?
                * 1024
                * 1024;
        }

        if let Ok(val) = std::env::var("LAYER_CACHE_MAX_ENTRIES") {
            config.max_entries = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("LAYER_CACHE_MAX_ENTRIES".to_string()))?;
        }

        if let Ok(val) = std::env::var("LAYER_CACHE_DEBUG") {
            config.debug_logging = match val.as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => return Err(ConfigError::InvalidValue("LAYER_CACHE_DEBUG".to_string())),
            };
        }

        Ok(config)
    }

    /// Returns the memory budget in megabytes.
    pub fn memory_budget_mb(&self) -> usize {
        self.memory_budget / (1024 * 1024)
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration key
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.memory_budget, 64 * 1024 * 1024);
        assert_eq!(config.max_entries, 512);
        assert!(!config.debug_logging);
        assert!(config.cache_dir.ends_with("layer-cache"));
    }

    #[test]
    fn builder_methods() {
        let config = CacheConfig::default()
            .with_cache_dir("/custom/path")
            .with_memory_budget_mb(128)
            .with_max_entries(64)
            .with_debug_logging(true);

        assert_eq!(config.cache_dir, PathBuf::from("/custom/path"));
        assert_eq!(config.memory_budget, 128 * 1024 * 1024);
        assert_eq!(config.memory_budget_mb(), 128);
        assert_eq!(config.max_entries, 64);
        assert!(config.debug_logging);
    }

    #[test]
    #[serial]
    fn from_env_full() {
        let _guard = EnvGuard::new(&[
            "LAYER_CACHE_DIR",
            "LAYER_CACHE_MEMORY_MB",
            "LAYER_CACHE_MAX_ENTRIES",
            "LAYER_CACHE_DEBUG",
        ]);

        env::set_var("LAYER_CACHE_DIR", "/tmp/test-cache");
        env::set_var("LAYER_CACHE_MEMORY_MB", "32");
        env::set_var("LAYER_CACHE_MAX_ENTRIES", "100");
        env::set_var("LAYER_CACHE_DEBUG", "true");

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/test-cache"));
        assert_eq!(config.memory_budget, 32 * 1024 * 1024);
        assert_eq!(config.max_entries, 100);
        assert!(config.debug_logging);
    }

    #[test]
    #[serial]
    fn from_env_partial_keeps_defaults() {
        let _guard = EnvGuard::new(&[
            "LAYER_CACHE_DIR",
            "LAYER_CACHE_MEMORY_MB",
            "LAYER_CACHE_MAX_ENTRIES",
            "LAYER_CACHE_DEBUG",
        ]);

        env::remove_var("LAYER_CACHE_DIR");
        env::remove_var("LAYER_CACHE_MAX_ENTRIES");
        env::remove_var("LAYER_CACHE_DEBUG");
        env::set_var("LAYER_CACHE_MEMORY_MB", "16");

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.memory_budget, 16 * 1024 * 1024);
        assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES); // default
        assert!(!config.debug_logging); // default
    }

    #[test]
    #[serial]
    fn from_env_rejects_bad_values() {
        let _guard = EnvGuard::new(&["LAYER_CACHE_MEMORY_MB", "LAYER_CACHE_DEBUG"]);

        env::remove_var("LAYER_CACHE_DEBUG");
        env::set_var("LAYER_CACHE_MEMORY_MB", "not_a_number");
        assert!(CacheConfig::from_env().is_err());

        env::remove_var("LAYER_CACHE_MEMORY_MB");
        env::set_var("LAYER_CACHE_DEBUG", "maybe");
        assert!(CacheConfig::from_env().is_err());
    }

    // Helper to save and restore environment variables
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }
}
