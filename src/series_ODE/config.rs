//! Solver configuration.
//!
//! ```toml
//! [series]
//! safety_margin = 16
//! detection_upper_bound = 32
//! parallel_system = false
//! loglevel = "info"
//! ```
use crate::Utils::logger::parse_loglevel;
use crate::series_ODE::errors::ConfigError;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesConfig {
    /// working margin: bounds canonicalization passes and widens the order detector's sweep
    pub safety_margin: usize,
    /// lowest upper bound used by the order detector's presence sweep
    pub detection_upper_bound: usize,
    /// advance system components on the rayon pool
    pub parallel_system: bool,
    /// "debug", "info", "warn", "error", "off"/"none"; None leaves logging alone
    pub loglevel: Option<String>,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        SeriesConfig {
            safety_margin: 16,
            detection_upper_bound: 32,
            parallel_system: false,
            loglevel: None,
        }
    }
}

fn read_usize(table: &toml::Table, key: &str) -> Result<Option<usize>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(v)) if *v >= 0 => Ok(Some(*v as usize)),
        Some(other) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected a non-negative integer, got {}", other),
        }),
    }
}

impl SeriesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_safety_margin(mut self, margin: usize) -> Self {
        self.safety_margin = margin;
        self
    }

    pub fn with_detection_upper_bound(mut self, bound: usize) -> Self {
        self.detection_upper_bound = bound;
        self
    }

    pub fn with_parallel_system(mut self, parallel: bool) -> Self {
        self.parallel_system = parallel;
        self
    }

    pub fn with_loglevel(mut self, loglevel: Option<String>) -> Self {
        self.loglevel = loglevel;
        self
    }

    /// Reads the `[series]` table; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let document: toml::Table = toml::from_str(content)?;
        let mut config = SeriesConfig::default();
        let table = match document.get("series") {
            None => return Ok(config),
            Some(toml::Value::Table(table)) => table,
            Some(_) => {
                return Err(ConfigError::InvalidValue {
                    key: "series".to_string(),
                    reason: "expected a table".to_string(),
                });
            }
        };
        if let Some(margin) = read_usize(table, "safety_margin")? {
            config.safety_margin = margin;
        }
        if let Some(bound) = read_usize(table, "detection_upper_bound")? {
            config.detection_upper_bound = bound;
        }
        match table.get("parallel_system") {
            None => {}
            Some(toml::Value::Boolean(flag)) => config.parallel_system = *flag,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "parallel_system".to_string(),
                    reason: format!("expected a boolean, got {}", other),
                });
            }
        }
        match table.get("loglevel") {
            None => {}
            Some(toml::Value::String(level)) if parse_loglevel(level).is_some() => {
                config.loglevel = Some(level.clone())
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "loglevel".to_string(),
                    reason: format!("must be debug, info, warn, error, off or none, got {}", other),
                });
            }
        }
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_for_missing_table() {
        let config = SeriesConfig::from_toml_str("").unwrap();
        assert_eq!(config, SeriesConfig::default());
        assert_eq!(config.safety_margin, 16);
    }

    #[test]
    fn test_partial_table() {
        let config =
            SeriesConfig::from_toml_str("[series]\nsafety_margin = 20\nloglevel = \"warn\"\n")
                .unwrap();
        assert_eq!(config.safety_margin, 20);
        assert_eq!(config.detection_upper_bound, 32);
        assert_eq!(config.loglevel.as_deref(), Some("warn"));
    }

    #[test]
    fn test_invalid_values() {
        let err = SeriesConfig::from_toml_str("[series]\nsafety_margin = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        let err = SeriesConfig::from_toml_str("[series]\nloglevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        let err = SeriesConfig::from_toml_str("[series\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[series]\nparallel_system = true\ndetection_upper_bound = 8").unwrap();
        let config = SeriesConfig::from_toml_file(file.path()).unwrap();
        assert!(config.parallel_system);
        assert_eq!(config.detection_upper_bound, 8);
        let missing = SeriesConfig::from_toml_file(Path::new("/nonexistent/series.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
