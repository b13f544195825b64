//! Configuration loading and management.
//!
//! Configuration is optional: every public `read_<format>` function runs with
//! [`ExtractionConfig::default`]. Files are TOML or JSON and can be discovered by
//! walking up from the current directory.

use crate::{Result, SharetextError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up by [`ExtractionConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "sharetext.toml";

/// Extraction options shared by every decoder.
///
/// # Example
///
/// ```rust
/// use sharetext::core::config::ExtractionConfig;
///
/// let config = ExtractionConfig {
///     extract_images: false,
///     ..Default::default()
/// };
/// assert!(config.collapse_blank_lines);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Decode embedded image payloads into `ImageRecord`s
    #[serde(default = "default_true")]
    pub extract_images: bool,

    /// Reject files larger than this many bytes in `read_file` (None = no limit)
    #[serde(default)]
    pub max_file_size: Option<u64>,

    /// Collapse runs of blank lines inside text units
    #[serde(default = "default_true")]
    pub collapse_blank_lines: bool,

    /// Append speaker notes to presentation slide text
    #[serde(default)]
    pub include_notes: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            extract_images: true,
            max_file_size: None,
            collapse_blank_lines: true,
            include_notes: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl ExtractionConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `SharetextError::Validation` if the file cannot be read or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| SharetextError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| SharetextError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration, choosing the parser from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(SharetextError::validation(format!(
                "Unsupported config file format: {} (expected .toml or .json)",
                path.display()
            ))),
        }
    }

    /// Search for `sharetext.toml` in the current directory and its parents.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let current = std::env::current_dir().map_err(SharetextError::Io)?;
        Self::discover_from(&current)
    }

    /// Like [`ExtractionConfig::discover`], starting at `start`.
    pub fn discover_from(start: &Path) -> Result<Option<Self>> {
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                tracing::debug!("Using config file {}", candidate.display());
                return Ok(Some(Self::from_toml_file(candidate)?));
            }
        }
        Ok(None)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| SharetextError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ExtractionConfig::default();
        assert!(config.extract_images);
        assert!(config.collapse_blank_lines);
        assert!(!config.include_notes);
        assert!(config.max_file_size.is_none());
    }

    #[test]
    fn test_from_toml_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("sharetext.toml");
        fs::write(&config_path, "extract_images = false\nmax_file_size = 1024\n").unwrap();

        let config = ExtractionConfig::from_toml_file(&config_path).unwrap();
        assert!(!config.extract_images);
        assert_eq!(config.max_file_size, Some(1024));
        assert!(config.collapse_blank_lines);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, r#"{"include_notes": true}"#).unwrap();

        let config = ExtractionConfig::from_file(&config_path).unwrap();
        assert!(config.include_notes);
        assert!(config.extract_images);
    }

    #[test]
    fn test_invalid_toml_is_validation_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("sharetext.toml");
        fs::write(&config_path, "extract_images = [not toml").unwrap();

        let err = ExtractionConfig::from_toml_file(&config_path).unwrap_err();
        assert!(matches!(err, SharetextError::Validation { .. }));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = ExtractionConfig::from_file("settings.yaml").unwrap_err();
        assert!(err.to_string().contains("Unsupported config file format"));
    }

    #[test]
    fn test_discover_from_walks_parents() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "include_notes = true\n").unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = ExtractionConfig::discover_from(&nested).unwrap();
        assert_eq!(config.map(|c| c.include_notes), Some(true));
    }

    #[test]
    fn test_discover_from_without_file() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("empty");
        fs::create_dir_all(&nested).unwrap();
        // Ancestors of the temp dir are outside the test's control.
        assert!(ExtractionConfig::discover_from(&nested).is_ok());
    }
}
