/*
 * This file is part of hwmon-readings.
 *
 * Copyright (C) 2025 hwmon-readings contributors
 *
 * hwmon-readings is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * hwmon-readings is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with hwmon-readings. If not, see <https://www.gnu.org/licenses/>.
 */

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hwmon::DEFAULT_HWMON_ROOT;

/// Overrides `hwmon_root` from the settings file.
pub const ROOT_ENV: &str = "HWMON_READINGS_ROOT";

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RichOutput {
    #[default]
    Auto,
    Always,
    Never,
}

fn default_hwmon_root() -> PathBuf {
    PathBuf::from(DEFAULT_HWMON_ROOT)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_hwmon_root")]
    pub hwmon_root: PathBuf,
    /// Event log destination when `--logging` is given
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub rich_output: RichOutput,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            hwmon_root: default_hwmon_root(),
            log_path: None,
            rich_output: RichOutput::Auto,
        }
    }
}

impl Settings {
    pub fn log_path(&self) -> PathBuf {
        self.log_path.clone().unwrap_or_else(default_log_path)
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("hwmon-readings").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("hwmon-readings")
            .join("config.json");
    }
    PathBuf::from("/etc/hwmon-readings/config.json")
}

pub fn default_log_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_STATE_HOME") {
        return Path::new(&xdg).join("hwmon-readings").join("events.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".local")
            .join("state")
            .join("hwmon-readings")
            .join("events.json");
    }
    PathBuf::from(crate::logger::FALLBACK_LOG_PATH)
}

/// Read settings from `path`. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
    };
    let settings: Settings = serde_json::from_str(&data)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Settings file at [`config_path`], then environment overrides.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let mut settings = load_settings_from(&config_path())?;
    apply_env_overrides(&mut settings);
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn apply_env_overrides(settings: &mut Settings) {
    if let Some(root) = env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
        settings.hwmon_root = PathBuf::from(root);
    }
}

pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.hwmon_root.as_os_str().is_empty() {
        return Err(ConfigError::Invalid {
            field: "hwmon_root".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if !settings.hwmon_root.is_absolute() {
        return Err(ConfigError::Invalid {
            field: "hwmon_root".to_string(),
            reason: format!("{} is not an absolute path", settings.hwmon_root.display()),
        });
    }
    if let Some(log) = &settings.log_path {
        if !log.is_absolute() {
            return Err(ConfigError::Invalid {
                field: "log_path".to_string(),
                reason: format!("{} is not an absolute path", log.display()),
            });
        }
    }
    Ok(())
}
