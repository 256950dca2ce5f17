//! @ai:module:intent Configuration structs for the doc-block tool
//! @ai:module:layer infrastructure
//! @ai:module:public_api DocblockConfig, PrinterConfig, RegistryConfig, ScanConfig
//! @ai:module:stateless true

use crate::error::Result;
use crate::printer::{DocBlockPrinter, DEFAULT_LINE_MARKER};
use crate::registry::{Registry, DEFAULT_TYPED_TAGS, DEFAULT_VARIABLE_TAGS, DEFAULT_VENDOR_PREFIXES};
use crate::type_expr::DocTypeMapper;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// @ai:intent Main configuration, read from `docblock.toml`
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocblockConfig {
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// @ai:intent Canonical style used for synthesized lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterConfig {
    #[serde(default = "default_line_marker")]
    pub line_marker: String,
}

/// @ai:intent Tag vocabulary for the standard recognizers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_variable_tags")]
    pub variable_tags: Vec<String>,
    #[serde(default = "default_typed_tags")]
    pub typed_tags: Vec<String>,
    #[serde(default = "default_vendor_prefixes")]
    pub vendor_prefixes: Vec<String>,
}

/// @ai:intent Which files the CLI walks when given a directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Restricts scanning to these extensions; empty means every supported one.
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            line_marker: default_line_marker(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            variable_tags: default_variable_tags(),
            typed_tags: default_typed_tags(),
            vendor_prefixes: default_vendor_prefixes(),
        }
    }
}

fn default_line_marker() -> String {
    DEFAULT_LINE_MARKER.to_string()
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_variable_tags() -> Vec<String> {
    to_strings(DEFAULT_VARIABLE_TAGS)
}

fn default_typed_tags() -> Vec<String> {
    to_strings(DEFAULT_TYPED_TAGS)
}

fn default_vendor_prefixes() -> Vec<String> {
    to_strings(DEFAULT_VENDOR_PREFIXES)
}

impl DocblockConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// @ai:intent Load the file if it exists, otherwise fall back to defaults
    /// @ai:effects fs:read
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// @ai:intent Save configuration to a TOML file
    /// @ai:effects fs:write
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn printer(&self) -> DocBlockPrinter {
        DocBlockPrinter::new(self.printer.line_marker.clone())
    }
}

impl RegistryConfig {
    /// @ai:intent Build a registry for this vocabulary
    pub fn build(&self) -> Registry {
        Registry::from_vocabulary(
            &self.variable_tags,
            &self.typed_tags,
            &self.vendor_prefixes,
            Arc::new(DocTypeMapper),
        )
    }
}

impl ScanConfig {
    /// @ai:intent Check if a file extension passes the scan filter
    pub fn accepts(&self, extension: &str) -> bool {
        self.extensions.is_empty() || self.extensions.iter().any(|e| e.trim_start_matches('.') == extension)
    }

    /// @ai:intent Check if a path contains an excluded component
    pub fn excludes(&self, path: &Path) -> bool {
        path.components()
            .any(|c| self.exclude.iter().any(|e| c.as_os_str() == e.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: DocblockConfig = toml::from_str("[registry]\ntyped_tags = [\"return\", \"see\"]\n").unwrap();
        assert_eq!(config.registry.typed_tags, vec!["return", "see"]);
        assert_eq!(config.registry.variable_tags, default_variable_tags());
        assert_eq!(config.printer.line_marker, " * ");
        assert!(config.scan.extensions.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docblock.toml");
        let mut config = DocblockConfig::default();
        config.scan.extensions = vec!["php".to_string()];
        config.save(&path).unwrap();

        let loaded = DocblockConfig::load(&path).unwrap();
        assert_eq!(loaded.scan.extensions, vec!["php"]);
        assert_eq!(loaded.registry.vendor_prefixes, default_vendor_prefixes());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = DocblockConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.printer.line_marker, DEFAULT_LINE_MARKER);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docblock.toml");
        std::fs::write(&path, "[printer\n").unwrap();
        assert!(matches!(DocblockConfig::load(&path), Err(crate::error::Error::Config(_))));
    }

    #[test]
    fn test_custom_vocabulary_registry() {
        let config = RegistryConfig {
            typed_tags: vec!["returns".to_string()],
            ..Default::default()
        };
        let registry = config.build();
        let resolved = registry.resolve("returns", "int");
        let crate::registry::Resolved::Tag(value) = resolved else {
            panic!("expected a tag value");
        };
        assert!(value.type_expr().is_some());
        let crate::registry::Resolved::Tag(value) = registry.resolve("return", "int") else {
            panic!("expected a tag value");
        };
        assert!(value.type_expr().is_none());
    }

    #[test]
    fn test_scan_filters() {
        let scan = ScanConfig {
            extensions: vec![".php".to_string()],
            exclude: vec!["vendor".to_string()],
        };
        assert!(scan.accepts("php"));
        assert!(!scan.accepts("js"));
        assert!(scan.excludes(Path::new("src/vendor/a.php")));
        assert!(!scan.excludes(Path::new("src/a.php")));
        assert!(ScanConfig::default().accepts("ts"));
    }
}
