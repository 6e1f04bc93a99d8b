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

//! Sensor naming: enumeration with per-label disambiguation, and lookup of a
//! single reading by identity or by its canonical string.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{LookupError, Result, SensorError};
use crate::hwmon::{Chip, SensorBackend, Session};
use crate::logger;

/// Hashable locator for one reading. Carries no value.
///
/// Displays as its canonical string, `chip_label[index].feature_name`, where
/// the index is omitted when it is 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorIdentity {
    /// Chip prefix, e.g. `coretemp`
    pub chip_label: String,
    /// Bus address of the chip
    pub address: i64,
    /// Feature name, e.g. `temp1`
    pub feature_name: String,
    /// Distinguishes chips that share `chip_label`; 0 for the first one seen
    #[serde(default)]
    pub index: u32,
}

impl SensorIdentity {
    pub fn new(chip_label: impl Into<String>, address: i64, feature_name: impl Into<String>) -> Self {
        SensorIdentity {
            chip_label: chip_label.into(),
            address,
            feature_name: feature_name.into(),
            index: 0,
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Label plus index suffix, e.g. `fluxcapacitor1`.
    pub fn chip_name(&self) -> String {
        chip_name(&self.chip_label, self.index)
    }
}

impl fmt::Display for SensorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.chip_name(), self.feature_name)
    }
}

fn chip_name(label: &str, index: u32) -> String {
    if index == 0 {
        label.to_string()
    } else {
        format!("{}{}", label, index)
    }
}

/// What to look up: a structured identity or a canonical string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Identity(SensorIdentity),
    Descriptor(String),
}

impl From<SensorIdentity> for Locator {
    fn from(id: SensorIdentity) -> Self {
        Locator::Identity(id)
    }
}

impl From<&SensorIdentity> for Locator {
    fn from(id: &SensorIdentity) -> Self {
        Locator::Identity(id.clone())
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Locator::Descriptor(s.to_string())
    }
}

impl From<String> for Locator {
    fn from(s: String) -> Self {
        Locator::Descriptor(s)
    }
}

/// Assigns each chip the smallest index not yet used for its label.
#[derive(Debug, Default)]
struct Disambiguator {
    used: HashSet<(String, u32)>,
}

impl Disambiguator {
    fn assign(&mut self, label: &str) -> u32 {
        let mut index = 0;
        while self.used.contains(&(label.to_string(), index)) {
            index += 1;
        }
        self.used.insert((label.to_string(), index));
        index
    }
}

/// List every sensor the backend exposes, in traversal order.
///
/// With `readable_only`, features whose read fails with an access error are
/// left out. Any other error aborts the enumeration.
pub fn enumerate_all_sensors<B>(backend: &B, readable_only: bool) -> Result<Vec<SensorIdentity>>
where
    B: SensorBackend + ?Sized,
{
    let session = Session::open(backend)?;
    let mut sensors = Vec::new();
    let mut labels = Disambiguator::default();

    for chip in session.chips()? {
        let chip_label = chip.label().into_owned();
        let index = labels.assign(&chip_label);

        for feature in &chip.features {
            if readable_only {
                match session.read(&chip, feature) {
                    Ok(_) => {}
                    Err(SensorError::Access(e)) => {
                        logger::log_event(
                            "feature_skipped",
                            json!({
                                "chip": chip_name(&chip_label, index),
                                "feature": feature.name,
                                "reason": e.reason.to_string(),
                            }),
                        );
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
            sensors.push(SensorIdentity {
                chip_label: chip_label.clone(),
                address: chip.address,
                feature_name: feature.name.clone(),
                index,
            });
        }
    }

    logger::log_event(
        "catalog_built",
        json!({ "count": sensors.len(), "readable_only": readable_only }),
    );
    Ok(sensors)
}

/// Turn a canonical string into an identity by matching it against a fresh catalog.
pub fn resolve_descriptor<B>(backend: &B, descriptor: &str) -> Result<SensorIdentity>
where
    B: SensorBackend + ?Sized,
{
    let mut by_name: HashMap<String, SensorIdentity> = enumerate_all_sensors(backend, false)?
        .into_iter()
        .map(|s| (s.to_string(), s))
        .collect();
    by_name
        .remove(descriptor)
        .ok_or_else(|| LookupError::UnknownDescriptor(descriptor.to_string()).into())
}

/// Read the current value of the sensor `locator` points at.
///
/// Fails with [`SensorError::Lookup`] if the chip or feature isn't there, and
/// passes access errors through unchanged if it is but can't be read.
pub fn read_sensor<B>(backend: &B, locator: impl Into<Locator>) -> Result<f64>
where
    B: SensorBackend + ?Sized,
{
    let sensor = match locator.into() {
        Locator::Identity(id) => id,
        Locator::Descriptor(s) => resolve_descriptor(backend, &s)?,
    };

    let session = Session::open(backend)?;
    let chips = session.chips()?;
    let chip = find_chip(&chips, &sensor).ok_or_else(|| {
        logger::log_event("lookup_failed", json!({ "sensor": sensor.to_string(), "missing": "chip" }));
        LookupError::ChipNotFound { label: sensor.chip_label.clone(), address: sensor.address }
    })?;
    let feature = chip.feature(&sensor.feature_name).ok_or_else(|| {
        logger::log_event("lookup_failed", json!({ "sensor": sensor.to_string(), "missing": "feature" }));
        LookupError::FeatureNotFound {
            feature: sensor.feature_name.clone(),
            chip: sensor.chip_name(),
        }
    })?;

    let value = session.read(chip, feature)?;
    logger::log_event("sensor_read", json!({ "sensor": sensor.to_string(), "value": value }));
    Ok(value)
}

// Address decides. Among chips at that address a label match wins, and when
// several chips share both label and address the index picks the one with
// that ordinal among same-label chips, as enumeration assigned it.
fn find_chip<'c>(chips: &'c [Chip], sensor: &SensorIdentity) -> Option<&'c Chip> {
    let mut first_at_address = None;
    let mut candidates = Vec::new();
    let mut ordinal = 0u32;
    for chip in chips {
        let same_label = chip.label() == sensor.chip_label;
        if chip.address == sensor.address {
            first_at_address.get_or_insert(chip);
            if same_label {
                candidates.push((ordinal, chip));
            }
        }
        if same_label {
            ordinal += 1;
        }
    }
    candidates
        .iter()
        .find(|(ordinal, _)| *ordinal == sensor.index)
        .or_else(|| candidates.first())
        .map(|(_, chip)| *chip)
        .or(first_at_address)
}
