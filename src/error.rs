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

//! Error types shared by the hardware layer, the catalog and the resolver.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, SensorError>;

/// A chip or feature could not be located. Always a caller-input problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Chip {label} not found at address {address}")]
    ChipNotFound { label: String, address: i64 },

    #[error("Feature {feature} not found on chip {chip}")]
    FeatureNotFound { feature: String, chip: String },

    #[error("Could not find a sensor matching descriptor {0}")]
    UnknownDescriptor(String),

    #[error("No readable temperature sensor found")]
    NoTemperatureSensor,
}

/// Why the hardware layer refused to produce a value.
#[derive(Error, Debug)]
pub enum AccessReason {
    #[error("permission denied")]
    PermissionDenied,

    #[error("no data available")]
    NoData,

    #[error("kernel interface error: {0}")]
    Kernel(#[source] io::Error),

    #[error("unparsable value {0:?}")]
    Malformed(String),
}

impl AccessReason {
    /// Classify an I/O error from a sysfs attribute read by its errno.
    pub fn from_io(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) if code == libc::EACCES || code == libc::EPERM => AccessReason::PermissionDenied,
            Some(code) if code == libc::ENODATA || code == libc::EAGAIN || code == libc::ENXIO => {
                AccessReason::NoData
            }
            _ if err.kind() == io::ErrorKind::PermissionDenied => AccessReason::PermissionDenied,
            _ => AccessReason::Kernel(err),
        }
    }
}

/// The layer located the feature but could not read it.
#[derive(Error, Debug)]
#[error("Can't read {feature} on {chip}: {reason}")]
pub struct SensorAccessError {
    pub chip: String,
    pub feature: String,
    #[source]
    pub reason: AccessReason,
}

#[derive(Error, Debug)]
pub enum SensorError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Access(#[from] SensorAccessError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("hardware layer used outside of a session")]
    NotInitialized,
}

impl SensorError {
    pub fn is_access(&self) -> bool {
        matches!(self, SensorError::Access(_))
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, SensorError::Lookup(_))
    }
}

/// Settings file problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse config {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}
