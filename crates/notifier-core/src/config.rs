//! Session configuration.
//!
//! ## Serde defaults
//!
//! Every section carries `#[serde(default)]`, so a config file only needs the
//! keys it wants to change. Missing keys fall back to `Default::default()`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use notifier_buffer::MIN_CAPACITY;

const APP_DIR: &str = "notifier";

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Notes store settings
    pub notes: NotesConfig,

    /// File loading settings
    pub files: FileConfig,

    /// Edit buffer settings
    pub buffer: BufferConfig,

    /// Recent files settings
    pub recent: RecentConfig,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Using default config: {}", err);
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads from the default config path.
    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }

    /// Saves the config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Saves the config to `path`, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Returns `<data dir>/notifier/<file>`, or just `<file>` when the platform
/// has no data directory.
fn data_file(file: &str) -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join(file))
        .unwrap_or_else(|| PathBuf::from(file))
}

/// Notes store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Location of the delimiter-separated notes file
    pub path: PathBuf,

    /// Write unsaved changes when the session is flushed on exit
    pub save_on_exit: bool,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            path: data_file("notes.txt"),
            save_on_exit: true,
        }
    }
}

/// File loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Files larger than this many bytes are truncated on load
    pub max_file_size: u64,

    /// How many leading bytes are sniffed for NUL when the extension is unknown
    pub sniff_len: usize,

    /// Extensions (lowercase, no dot) that are always treated as text
    pub text_extensions: Vec<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            sniff_len: 512,
            text_extensions: [
                "txt", "md", "markdown", "rst", "log", "csv", "tsv", "json", "toml", "yaml",
                "yml", "ini", "cfg", "conf", "xml", "html", "htm", "css", "js", "ts", "rs",
                "py", "rb", "go", "java", "c", "h", "cpp", "hpp", "cc", "sh", "bash", "zsh",
                "sql",
            ]
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
        }
    }
}

impl FileConfig {
    /// Returns true if `path` has an allow-listed text extension.
    pub fn is_text_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.text_extensions.iter().any(|known| *known == ext)
            })
            .unwrap_or(false)
    }
}

/// Edit buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Starting capacity of every edit buffer; never below the built-in minimum
    pub min_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            min_capacity: MIN_CAPACITY,
        }
    }
}

impl BufferConfig {
    /// Returns the configured capacity clamped to the built-in minimum.
    pub fn capacity(&self) -> usize {
        self.min_capacity.max(MIN_CAPACITY)
    }
}

/// Recent files configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentConfig {
    /// Maximum number of remembered paths
    pub max_entries: usize,

    /// Side file the ledger is persisted to
    pub path: PathBuf,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            max_entries: 10,
            path: data_file("recent.txt"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.files.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.files.sniff_len, 512);
        assert_eq!(config.recent.max_entries, 10);
        assert_eq!(config.buffer.capacity(), MIN_CAPACITY);
        assert!(config.notes.save_on_exit);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.recent.max_entries, config.recent.max_entries);
        assert_eq!(parsed.notes.path, config.notes.path);
    }

    #[test]
    fn test_partial_config() {
        let parsed: Config = toml::from_str("[recent]\nmax_entries = 3\n").unwrap();
        assert_eq!(parsed.recent.max_entries, 3);
        assert_eq!(parsed.files.sniff_len, 512);
    }

    #[test]
    fn test_min_capacity_is_clamped() {
        let config = BufferConfig { min_capacity: 16 };
        assert_eq!(config.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn test_text_extension_is_case_insensitive() {
        let files = FileConfig::default();
        assert!(files.is_text_extension(Path::new("README.MD")));
        assert!(!files.is_text_extension(Path::new("image.png")));
        assert!(!files.is_text_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.recent.max_entries = 4;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.recent.max_entries, 4);
    }
}
