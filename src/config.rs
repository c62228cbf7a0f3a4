//! Configuration loading for the category table and watched folder.
//!
//! Configuration is read once at startup and never mutated afterwards. The
//! primary format is JSON, matching the layout below; files ending in `.toml`
//! are parsed as TOML with the same field names.
//!
//! # Configuration File Format
//!
//! ```json
//! {
//!   "filetypes": [
//!     { "name": "PDF document", "extension": ".pdf", "category": "Documents" },
//!     { "name": "Disk image", "extension": ".iso", "category": "Images" }
//!   ],
//!   "download_folder": "/home/me/Downloads",
//!   "transient_suffixes": [".crdownload", ".part", ".tmp"],
//!   "debounce_ms": 250
//! }
//! ```
//!
//! Only `filetypes` is required.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "config.json";

/// Suffixes browsers append to downloads that are still being written.
pub const DEFAULT_TRANSIENT_SUFFIXES: &[&str] = &[".crdownload", ".part", ".tmp", ".download"];

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found at the given path (or any search location).
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// The file could not be decoded.
    #[error("can't decode configuration: {0}")]
    ConfigInvalid(String),
    /// A single rule failed validation.
    #[error("invalid filetype rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },
    /// A rule's extension could not be turned into a glob pattern.
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },
    /// IO error while reading configuration.
    #[error("can't read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// No download folder was configured and the home directory is unknown.
    #[error("can't determine user home directory")]
    HomeDirUnavailable,
}

/// A single extension-to-category mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Display label, informational only.
    #[serde(default)]
    pub name: String,
    /// Suffix to match, e.g. ".pdf".
    pub extension: String,
    /// Folder name under the watched root.
    pub category: String,
}

impl CategoryRule {
    pub fn new(name: &str, extension: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            extension: extension.to_string(),
            category: category.to_string(),
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Category rules in file order.
    pub filetypes: Vec<CategoryRule>,

    /// Folder to watch. Falls back to `~/Downloads` when absent.
    #[serde(default)]
    pub download_folder: Option<PathBuf>,

    /// File name suffixes that mark in-progress downloads.
    #[serde(default = "default_transient_suffixes")]
    pub transient_suffixes: Vec<String>,

    /// Window for coalescing bursts of events into one sweep. Zero disables it.
    #[serde(default)]
    pub debounce_ms: u64,
}

fn default_transient_suffixes() -> Vec<String> {
    DEFAULT_TRANSIENT_SUFFIXES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Creates a configuration with the given rules and default settings.
    pub fn with_rules(filetypes: Vec<CategoryRule>) -> Self {
        Self {
            filetypes,
            download_folder: None,
            transient_suffixes: default_transient_suffixes(),
            debounce_ms: 0,
        }
    }

    /// Load configuration from the first location that exists.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. `config.json` in the current directory
    /// 3. `config.toml` in the current directory
    /// 4. `<config dir>/watchdawg/config.json` (e.g. `~/.config/watchdawg/config.json`)
    ///
    /// There is no built-in rule set, so finding nothing is an error.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::from_file(path);
        }

        let mut candidates = vec![PathBuf::from(CONFIG_FILE), PathBuf::from("config.toml")];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("watchdawg").join(CONFIG_FILE));
        }

        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Self::from_file(path),
            None => Err(ConfigError::ConfigNotFound(PathBuf::from(CONFIG_FILE))),
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if parsing fails.
    /// Returns `ConfigError::Io` if file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Checks that every rule can be matched and moved safely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filetypes.is_empty() {
            return Err(ConfigError::ConfigInvalid(
                "'filetypes' must contain at least one rule".to_string(),
            ));
        }

        for (index, rule) in self.filetypes.iter().enumerate() {
            let invalid = |reason: &str| ConfigError::InvalidRule {
                index,
                reason: reason.to_string(),
            };

            if rule.extension.is_empty() {
                return Err(invalid("extension is empty"));
            }
            if rule.extension.contains(['/', '\\']) {
                return Err(invalid("extension must not contain path separators"));
            }
            if !is_single_component(&rule.category) {
                return Err(invalid(
                    "category must be a single folder name (no separators, '.' or '..')",
                ));
            }
        }

        Ok(())
    }

    /// Resolves the folder to watch.
    ///
    /// Precedence: the command-line override, then `download_folder`, then
    /// `<home>/Downloads`.
    pub fn resolve_root(&self, cli_override: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = &self.download_folder {
            return Ok(path.clone());
        }
        dirs::home_dir()
            .map(|home| home.join("Downloads"))
            .ok_or(ConfigError::HomeDirUnavailable)
    }

    /// Debounce window, if enabled.
    pub fn debounce(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then(|| Duration::from_millis(self.debounce_ms))
    }
}

fn is_single_component(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE_JSON: &str = r#"{
        "filetypes": [
            { "name": "PDF", "extension": ".pdf", "category": "Documents" },
            { "name": "Text", "extension": ".txt", "category": "Documents" },
            { "name": "Zip", "extension": ".zip", "category": "Archives" }
        ]
    }"#;

    #[test]
    fn test_parse_original_json_layout() {
        let config = Config::from_json_str(SAMPLE_JSON).unwrap();

        assert_eq!(config.filetypes.len(), 3);
        assert_eq!(
            config.filetypes[0],
            CategoryRule::new("PDF", ".pdf", "Documents")
        );
        assert_eq!(config.download_folder, None);
        assert_eq!(config.debounce_ms, 0);
        assert!(config.transient_suffixes.contains(&".crdownload".to_string()));
        assert!(config.transient_suffixes.contains(&".part".to_string()));
        assert!(config.transient_suffixes.contains(&".tmp".to_string()));
    }

    #[test]
    fn test_transient_suffixes_override() {
        let config = Config::from_json_str(
            r#"{"filetypes": [], "transient_suffixes": [".partial"], "debounce_ms": 200}"#,
        )
        .unwrap();

        assert_eq!(config.transient_suffixes, vec![".partial".to_string()]);
        assert_eq!(config.debounce(), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_parse_toml_layout() {
        let config = Config::from_toml_str(
            r#"
            download_folder = "/tmp/dl"

            [[filetypes]]
            extension = ".mp3"
            category = "Music"
            "#,
        )
        .unwrap();

        assert_eq!(config.filetypes[0].name, "");
        assert_eq!(config.filetypes[0].category, "Music");
        assert_eq!(config.download_folder, Some(PathBuf::from("/tmp/dl")));
    }

    #[test]
    fn test_malformed_json_is_invalid() {
        let result = Config::from_json_str("{ \"filetypes\": [ { \"extension\": ");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.json");

        let result = Config::load(Some(&missing));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(p)) if p == missing));
    }

    #[test]
    fn test_from_file_dispatches_on_extension() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("config.json");
        let toml_path = temp_dir.path().join("config.toml");
        fs::write(&json_path, SAMPLE_JSON).unwrap();
        fs::write(
            &toml_path,
            "[[filetypes]]\nextension = \".iso\"\ncategory = \"Images\"\n",
        )
        .unwrap();

        assert_eq!(Config::from_file(&json_path).unwrap().filetypes.len(), 3);
        assert_eq!(
            Config::from_file(&toml_path).unwrap().filetypes[0].extension,
            ".iso"
        );
    }

    #[test]
    fn test_validate_accepts_sample() {
        let config = Config::from_json_str(SAMPLE_JSON).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_rule_set() {
        let config = Config::with_rules(Vec::new());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_categories() {
        for category in ["", ".", "..", "a/b", "a\\b"] {
            let config = Config::with_rules(vec![CategoryRule::new("x", ".pdf", category)]);
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidRule { index: 0, .. })),
                "category {:?} should be rejected",
                category
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_extensions() {
        for extension in ["", "dir/.pdf"] {
            let config = Config::with_rules(vec![
                CategoryRule::new("ok", ".txt", "Documents"),
                CategoryRule::new("bad", extension, "Documents"),
            ]);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidRule { index: 1, .. })
            ));
        }
    }

    #[test]
    fn test_resolve_root_precedence() {
        let mut config = Config::with_rules(vec![CategoryRule::new("", ".txt", "Documents")]);
        config.download_folder = Some(PathBuf::from("/configured"));

        assert_eq!(
            config.resolve_root(Some(Path::new("/override"))).unwrap(),
            PathBuf::from("/override")
        );
        assert_eq!(
            config.resolve_root(None).unwrap(),
            PathBuf::from("/configured")
        );
    }

    #[test]
    fn test_resolve_root_defaults_to_downloads() {
        let config = Config::with_rules(vec![CategoryRule::new("", ".txt", "Documents")]);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.resolve_root(None).unwrap(), home.join("Downloads"));
        }
    }

    #[test]
    fn test_debounce_disabled_by_default() {
        let config = Config::with_rules(Vec::new());
        assert_eq!(config.debounce(), None);
    }
}
