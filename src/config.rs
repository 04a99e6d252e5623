//! Run configuration, loaded from YAML.
//!
//! ```yaml
//! max_cycles: 100
//! por_cycles: 2
//! log_level: info
//! capacity:
//!   parts: 64
//!   bindings: 256
//!   hooks_per_phase: 10
//!   nets: 65536
//! trace:
//!   path: sample.trc
//!   netlist_path: nets.csv
//! ```
//!
//! Every key is optional.

use crate::circuit::{DEFAULT_NET_SIBS, MAX_NET_SIBS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Sizes of the fixed capacity pools.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Capacity {
    #[serde(default = "default_parts")]
    pub parts: usize,

    #[serde(default = "default_bindings")]
    pub bindings: usize,

    /// Hooks per [Phase](crate::circuit::Phase)
    #[serde(default = "default_hooks_per_phase")]
    pub hooks_per_phase: usize,

    /// Sibs the nets can hold
    #[serde(default = "default_nets")]
    pub nets: usize,
}

fn default_parts() -> usize {
    64
}

fn default_bindings() -> usize {
    256
}

fn default_hooks_per_phase() -> usize {
    10
}

fn default_nets() -> usize {
    DEFAULT_NET_SIBS
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            parts: default_parts(),
            bindings: default_bindings(),
            hooks_per_phase: default_hooks_per_phase(),
            nets: default_nets(),
        }
    }
}

/// Where the trace goes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Binary trace file
    pub path: PathBuf,

    /// Also write the netlist as a standalone CSV file, the one the trace embeds
    #[serde(default)]
    pub netlist_path: Option<PathBuf>,
}

/// Everything a run needs besides the circuit itself.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Last cycle to run, cycles are numbered from 1
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u64,

    /// Number of cycles power on reset stays asserted
    #[serde(default = "default_por_cycles")]
    pub por_cycles: u64,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub capacity: Capacity,

    /// Tracing is disabled when absent
    #[serde(default)]
    pub trace: Option<TraceConfig>,
}

fn default_max_cycles() -> u64 {
    10
}

fn default_por_cycles() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
            por_cycles: default_por_cycles(),
            log_level: default_log_level(),
            capacity: Capacity::default(),
            trace: None,
        }
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_cycles == 0 {
            return Err(ConfigError::Validation(
                "max_cycles must be at least 1".to_string(),
            ));
        }
        let Capacity {
            parts,
            bindings,
            hooks_per_phase,
            nets,
        } = self.capacity;
        for (name, value) in &[
            ("parts", parts),
            ("bindings", bindings),
            ("hooks_per_phase", hooks_per_phase),
            ("nets", nets),
        ] {
            if *value == 0 {
                return Err(ConfigError::Validation(format!(
                    "capacity.{} must be greater than 0",
                    name
                )));
            }
        }
        if nets > MAX_NET_SIBS {
            return Err(ConfigError::Validation(format!(
                "capacity.nets must be at most {}",
                MAX_NET_SIBS
            )));
        }
        if let Some(trace) = &self.trace {
            if trace.path.as_os_str().is_empty() {
                return Err(ConfigError::Validation("empty trace path".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::new();
        assert_eq!(config.max_cycles, 10);
        assert_eq!(config.por_cycles, 2);
        assert_eq!(config.capacity.parts, 64);
        assert_eq!(config.capacity.bindings, 256);
        assert_eq!(config.capacity.hooks_per_phase, 10);
        assert_eq!(config.capacity.nets, 65536);
        assert!(config.trace.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
max_cycles: 100
log_level: debug
capacity:
  hooks_per_phase: 4
trace:
  path: out.trc
"#;
        let config = SimConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.max_cycles, 100);
        assert_eq!(config.por_cycles, 2);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.capacity.hooks_per_phase, 4);
        assert_eq!(config.capacity.parts, 64);
        let trace = config.trace.unwrap();
        assert_eq!(trace.path, PathBuf::from("out.trc"));
        assert_eq!(trace.netlist_path, None);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(SimConfig::from_yaml("{}").unwrap(), SimConfig::default());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            SimConfig::from_yaml("max_cycles: 0"),
            Err(ConfigError::Validation(_))
        ));
        let err = SimConfig::from_yaml("capacity:\n  bindings: 0").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: capacity.bindings must be greater than 0"
        );
        assert!(matches!(
            SimConfig::from_yaml("capacity:\n  nets: 0"),
            Err(ConfigError::Validation(_))
        ));
        let huge = format!("capacity:\n  nets: {}", MAX_NET_SIBS + 1);
        assert!(matches!(
            SimConfig::from_yaml(&huge),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            SimConfig::from_yaml("max_cycles: lots"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.yaml");
        let mut config = SimConfig::default();
        config.por_cycles = 5;
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();
        assert_eq!(SimConfig::from_yaml_file(&path).unwrap(), config);
        assert!(matches!(
            SimConfig::from_yaml_file(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
