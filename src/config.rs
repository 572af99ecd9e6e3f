//! Site configuration module.
//!
//! Handles loading and validating the optional `.jenius.toml` at the root of
//! the source tree. The file name starts with a dot, so the build planner
//! never copies it to a destination.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [markup]
//! extension = "xumlv"          # Source files rendered through the template
//! output_extension = "html"    # Extension of rendered files
//! output = "html"              # "html" (validated) or "xml"
//! index = "index.xumlv"        # Directory index page, titles breadcrumbs
//!
//! [layout]
//! private_dir = "PRIVATE"      # Directories with this name go to the private destination only
//!
//! [processing]
//! max_processes = 4            # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::component::OutputKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up at the source root.
pub const CONFIG_FILE: &str = ".jenius.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `.jenius.toml`.
///
/// All fields have defaults; a config file only needs the values it wants to
/// override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Source and output file conventions.
    pub markup: MarkupConfig,
    /// Destination layout.
    pub layout: LayoutConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("markup.extension", &self.markup.extension),
            ("markup.output_extension", &self.markup.output_extension),
        ] {
            if value.is_empty() || value.contains(['.', '/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a bare extension without dots or separators, got {value:?}"
                )));
            }
        }
        if self.markup.extension == self.markup.output_extension {
            return Err(ConfigError::Validation(
                "markup.extension and markup.output_extension must differ".into(),
            ));
        }
        if self.markup.index.is_empty() || self.markup.index.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "markup.index must be a file name".into(),
            ));
        }
        if self.layout.private_dir.is_empty()
            || self.layout.private_dir.starts_with('.')
            || self.layout.private_dir.contains(['/', '\\'])
        {
            return Err(ConfigError::Validation(
                "layout.private_dir must be a plain directory name".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Markup conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupConfig {
    /// Extension (without dot) of markup sources.
    pub extension: String,
    /// Extension (without dot) that rendered sources get.
    pub output_extension: String,
    /// Serialization of rendered pages.
    pub output: OutputKind,
    /// File name of a directory's index page.
    pub index: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            extension: "xumlv".to_string(),
            output_extension: "html".to_string(),
            output: OutputKind::Html,
            index: "index.xumlv".to_string(),
        }
    }
}

/// Destination layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Name of the directories holding private-only content.
    pub private_dir: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            private_dir: "PRIVATE".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of files generated in parallel.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse and validate a config file.
pub fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: SiteConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load `.jenius.toml` from a source root, or defaults when there is none.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(SiteConfig::default());
    }
    load_config_file(&path)
}

/// Returns a fully-commented stock `.jenius.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Jenius Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file at the root of the source tree as .jenius.toml, or pass it
# with --config. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Markup
# ---------------------------------------------------------------------------
[markup]
# Extension of source files rendered through the template.
extension = "xumlv"

# Extension given to rendered files in the destination.
output_extension = "html"

# Output flavor: "html" writes a doctype and rejects elements that are not
# HTML; "xml" keeps the source declaration and self-closes empty elements.
output = "html"

# Index page of a directory. Its title names the directory in breadcrumbs.
index = "index.xumlv"

# ---------------------------------------------------------------------------
# Layout
# ---------------------------------------------------------------------------
[layout]
# Directories with this name are generated into the private destination only.
private_dir = "PRIVATE"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit for auto (= number of CPU cores).
# Values larger than the core count are clamped.
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.markup.extension, "xumlv");
        assert_eq!(config.markup.output_extension, "html");
        assert_eq!(config.markup.output, OutputKind::Html);
        assert_eq!(config.markup.index, "index.xumlv");
        assert_eq!(config.layout.private_dir, "PRIVATE");
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[markup]
output = "xml"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.markup.output, OutputKind::Xml);
        // Default values preserved
        assert_eq!(config.markup.extension, "xumlv");
        assert_eq!(config.layout.private_dir, "PRIVATE");
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[layout]
private_dir = "SECRET"

[processing]
max_processes = 2
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.layout.private_dir, "SECRET");
        assert_eq!(config.processing.max_processes, Some(2));
        assert_eq!(config.markup, MarkupConfig::default());
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_file_missing_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config_file(&tmp.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    // =========================================================================
    // Unknown keys
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[markup]\nextention = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[serve]\nport = 8080\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_output_kind_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[markup]\noutput = \"pdf\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_extension_with_dot() {
        let mut config = SiteConfig::default();
        config.markup.extension = ".xumlv".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_same_extensions() {
        let mut config = SiteConfig::default();
        config.markup.output_extension = "xumlv".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_private_dir_name() {
        let mut config = SiteConfig::default();
        config.layout.private_dir = "a/b".into();
        assert!(config.validate().is_err());
        config.layout.private_dir = ".private".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_processes() {
        let mut config = SiteConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[markup]\nextension = \"\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // Processing
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 100),
        };
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }
}
