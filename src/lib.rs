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

//! hwmon-readings - named, addressable hardware sensor readings for Linux
//!
//! Chips detected by the hwmon subsystem are enumerated into
//! [`SensorIdentity`] values whose canonical strings (`coretemp.temp1`,
//! `nvme1.temp1`, ...) stay unique even when several chips share a label.
//! A single reading can then be fetched by identity or by that string.

pub mod config;
pub mod error;
pub mod hwmon;
pub mod logger;
pub mod report;
pub mod sensors;

#[cfg(test)]
pub mod test_utils;

pub use error::{LookupError, SensorAccessError, SensorError};
pub use hwmon::{SensorBackend, Session, SysfsBackend};
pub use report::report_all_readings;
pub use sensors::{enumerate_all_sensors, read_sensor, Locator, SensorIdentity};
