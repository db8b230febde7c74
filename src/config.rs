//! Configuration management for the hide daemon.
//!
//! Defaults are embedded at compile time from `config/default.yaml`. A user
//! file only needs to name the fields it changes; everything else keeps the
//! embedded value.

use crate::error::{ConfigError, HideError, Result};
use crate::matcher::DEFAULT_MIN_LEN;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_YAML: &str = include_str!("../config/default.yaml");

const SDK_PROP: &str = "ro.build.version.sdk";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Root holding one directory per multiuser profile
    pub app_data_dir: PathBuf,
    pub proc_dir: PathBuf,
    pub database: PathBuf,
    pub socket_path: PathBuf,
    #[serde(default = "default_allowed_uids")]
    pub allowed_uids: Vec<u32>,
    #[serde(default = "default_min_len")]
    pub min_len: usize,
    #[serde(default)]
    pub sdk_int: Option<u32>,
    pub build_prop: PathBuf,
    pub monitor_interval_ms: u64,
}

fn default_allowed_uids() -> Vec<u32> {
    vec![0]
}

fn default_min_len() -> usize {
    DEFAULT_MIN_LEN
}

impl Config {
    /// Loads the embedded default configuration.
    pub fn load_default() -> Result<Self> {
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_YAML).map_err(|e| {
            ConfigError::Validation(format!("Error parsing embedded config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file on top of the embedded defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()).into());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_over_defaults(&contents)
    }

    fn from_yaml_over_defaults(contents: &str) -> Result<Self> {
        let mut merged: serde_yaml::Value = serde_yaml::from_str(DEFAULT_CONFIG_YAML)?;
        let user: serde_yaml::Value = serde_yaml::from_str(contents)?;

        match (merged.as_mapping_mut(), user) {
            (Some(base), serde_yaml::Value::Mapping(overrides)) => {
                for (key, value) in overrides {
                    base.insert(key, value);
                }
            }
            // Empty file
            (_, serde_yaml::Value::Null) => {}
            _ => {
                return Err(ConfigError::Validation(
                    "configuration must be a YAML mapping".to_string(),
                )
                .into())
            }
        }

        let config: Config = serde_yaml::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, the embedded defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::load_default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| -> Result<()> {
            Err(HideError::Config(ConfigError::Validation(msg.to_string())))
        };

        if self.min_len == 0 {
            return fail("min_len must be greater than zero");
        }
        if self.monitor_interval_ms == 0 {
            return fail("monitor_interval_ms must be greater than zero");
        }
        for (name, path) in [
            ("app_data_dir", &self.app_data_dir),
            ("proc_dir", &self.proc_dir),
            ("database", &self.database),
            ("socket_path", &self.socket_path),
        ] {
            if path.as_os_str().is_empty() {
                return fail(&format!("{} must not be empty", name));
            }
        }
        Ok(())
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    /// Path probed for mount namespace support.
    pub fn mnt_ns_path(&self) -> PathBuf {
        self.proc_dir.join("self").join("ns").join("mnt")
    }

    /// Configured SDK level, falling back to the build properties.
    pub fn sdk_int(&self) -> Option<u32> {
        self.sdk_int.or_else(|| read_sdk_prop(&self.build_prop))
    }
}

fn read_sdk_prop(build_prop: &Path) -> Option<u32> {
    let contents = match std::fs::read_to_string(build_prop) {
        Ok(contents) => contents,
        Err(e) => {
            log::debug!("Cannot read {}: {}", build_prop.display(), e);
            return None;
        }
    };

    contents.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        if key.trim() == SDK_PROP {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}
