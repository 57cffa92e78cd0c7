//! Conversion settings loaded from YAML
//!
//! ```yaml
//! frame_interval: 2
//! jobs: 4
//! recursive: true
//! extension: aris
//! write_rasters: false
//! ```
//!
//! Every key is optional. Unknown keys are rejected so that typos do not pass
//! silently.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ArisError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// Keep every Nth decoded frame
    pub frame_interval: u32,
    /// Recordings converted concurrently in batch mode
    pub jobs: usize,
    /// Descend into subdirectories when discovering inputs
    pub recursive: bool,
    /// Input file extension, matched case-insensitively
    pub extension: String,
    /// Write `.raw` raster files next to frame documents
    pub write_rasters: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            frame_interval: 1,
            jobs: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            recursive: false,
            extension: "aris".to_string(),
            write_rasters: true,
        }
    }
}

impl ConversionConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ArisError::config_error("YAML parsing", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml =
            std::fs::read_to_string(path).map_err(|e| ArisError::file_error(path, e))?;
        Self::from_yaml_str(&yaml).map_err(|e| match e {
            ArisError::Config { context, details } => ArisError::Config {
                context: format!("{} ({})", context, path.display()),
                details,
            },
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_interval == 0 {
            return Err(ArisError::config_error("frame_interval", "must be at least 1"));
        }
        if self.jobs == 0 {
            return Err(ArisError::config_error("jobs", "must be at least 1"));
        }
        let extension = self.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(ArisError::config_error("extension", "must not be empty"));
        }
        Ok(())
    }

    /// Extension without a leading dot.
    pub fn normalized_extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn defaults_are_valid() -> Result<()> {
        let config = ConversionConfig::default();
        config.validate()?;
        assert_eq!(config.frame_interval, 1);
        assert!(config.jobs >= 1);
        assert_eq!(config.extension, "aris");
        assert!(config.write_rasters);
        assert!(!config.recursive);
        Ok(())
    }

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let config = ConversionConfig::from_yaml_str("frame_interval: 5\nrecursive: true\n")?;
        assert_eq!(config.frame_interval, 5);
        assert!(config.recursive);
        assert_eq!(config.extension, "aris");
        assert_eq!(config, ConversionConfig { frame_interval: 5, recursive: true, ..Default::default() });
        Ok(())
    }

    #[test]
    fn empty_document_is_default() -> Result<()> {
        assert_eq!(ConversionConfig::from_yaml_str("  \n")?, ConversionConfig::default());
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = ConversionConfig::from_yaml_str("frame_intervall: 2\n");
        assert!(matches!(result, Err(ArisError::Config { .. })));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (yaml, key) in [
            ("frame_interval: 0", "frame_interval"),
            ("jobs: 0", "jobs"),
            ("extension: '.'", "extension"),
        ] {
            match ConversionConfig::from_yaml_str(yaml) {
                Err(ArisError::Config { context, .. }) => assert_eq!(context, key),
                other => panic!("Expected Config error for {:?}, got {:?}", yaml, other),
            }
        }
    }

    #[test]
    fn extension_dot_is_optional() -> Result<()> {
        let config = ConversionConfig::from_yaml_str("extension: .ARIS")?;
        assert_eq!(config.normalized_extension(), "ARIS");
        Ok(())
    }

    #[test]
    fn from_file_names_the_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("convert.yaml");
        std::fs::write(&path, "jobs: 0\n")?;

        match ConversionConfig::from_file(&path) {
            Err(ArisError::Config { context, .. }) => {
                assert!(context.contains("convert.yaml"), "context was {}", context)
            }
            other => panic!("Expected Config error, got {:?}", other),
        }

        std::fs::write(&path, "jobs: 3\nwrite_rasters: false\n")?;
        let config = ConversionConfig::from_file(&path)?;
        assert_eq!(config.jobs, 3);
        assert!(!config.write_rasters);
        Ok(())
    }

    #[test]
    fn missing_file_is_file_error() {
        assert!(matches!(
            ConversionConfig::from_file("/nonexistent/convert.yaml"),
            Err(ArisError::File { .. })
        ));
    }
}
