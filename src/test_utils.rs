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

//! Test utilities and fixtures for unit tests

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{AccessReason, Result, SensorAccessError, SensorError};
use crate::hwmon::{BusKind, Chip, Feature, FeatureKind, SensorBackend};

#[derive(Debug, Clone, Copy)]
pub enum FakeValue {
    Value(f64),
    Denied,
}

/// Chip description for [`FakeBackend`]
pub struct FakeChip {
    label: String,
    address: i64,
    features: Vec<(String, FakeValue)>,
}

impl FakeChip {
    pub fn new(label: &str, address: i64) -> Self {
        FakeChip { label: label.to_string(), address, features: Vec::new() }
    }

    pub fn feature(mut self, name: &str, value: f64) -> Self {
        self.features.push((name.to_string(), FakeValue::Value(value)));
        self
    }

    pub fn unreadable(mut self, name: &str) -> Self {
        self.features.push((name.to_string(), FakeValue::Denied));
        self
    }
}

// Keyed by chip path so chips sharing label and address stay apart
type ValueKey = (PathBuf, String);

/// In-memory backend that tracks session balance
pub struct FakeBackend {
    chips: Vec<Chip>,
    values: HashMap<ValueKey, FakeValue>,
    io_failures: RefCell<HashSet<String>>,
    open: Cell<i32>,
    opened: Cell<usize>,
}

impl FakeBackend {
    pub fn new(chips: Vec<FakeChip>) -> Self {
        let mut values = HashMap::new();
        let chips = chips
            .into_iter()
            .enumerate()
            .map(|(nr, fc)| {
                let prefix = fc.label.clone().into_bytes();
                let path = PathBuf::from(format!("fake/hwmon{}", nr));
                let features = fc
                    .features
                    .iter()
                    .map(|(name, value)| {
                        values.insert((path.clone(), name.clone()), *value);
                        let kind = FeatureKind::from_feature_name(name).unwrap_or(FeatureKind::Temp);
                        Feature {
                            name: name.clone(),
                            kind,
                            label: None,
                            attribute: name.clone(),
                        }
                    })
                    .collect();
                Chip {
                    prefix,
                    address: fc.address,
                    bus: BusKind::Virtual,
                    path,
                    features,
                }
            })
            .collect();
        FakeBackend {
            chips,
            values,
            io_failures: RefCell::new(HashSet::new()),
            open: Cell::new(0),
            opened: Cell::new(0),
        }
    }

    /// Make reads of `feature` fail with a plain I/O error instead of an access error
    pub fn fail_reads_with_io(&self, feature: &str) {
        self.io_failures.borrow_mut().insert(feature.to_string());
    }

    pub fn open_sessions(&self) -> i32 {
        self.open.get()
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.get()
    }
}

impl SensorBackend for FakeBackend {
    fn init(&self) -> Result<()> {
        self.open.set(self.open.get() + 1);
        self.opened.set(self.opened.get() + 1);
        Ok(())
    }

    fn cleanup(&self) {
        self.open.set(self.open.get() - 1);
    }

    fn detected_chips(&self) -> Result<Vec<Chip>> {
        if self.open.get() <= 0 {
            return Err(SensorError::NotInitialized);
        }
        Ok(self.chips.clone())
    }

    fn read_value(&self, chip: &Chip, feature: &Feature) -> Result<f64> {
        if self.open.get() <= 0 {
            return Err(SensorError::NotInitialized);
        }
        if self.io_failures.borrow().contains(&feature.name) {
            return Err(io::Error::new(io::ErrorKind::Other, "bus went away").into());
        }
        let key = (chip.path.clone(), feature.name.clone());
        match self.values.get(&key) {
            Some(FakeValue::Value(v)) => Ok(*v),
            Some(FakeValue::Denied) => Err(SensorAccessError {
                chip: chip.label().into_owned(),
                feature: feature.name.clone(),
                reason: AccessReason::PermissionDenied,
            }
            .into()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "unknown feature").into()),
        }
    }
}

/// The chip set used throughout the catalog and resolver tests
pub fn reference_chips() -> Vec<FakeChip> {
    vec![
        FakeChip::new("ppu", 314).feature("freq", 100.0).feature("temp", -273.15),
        FakeChip::new("heisenbergcompensator", 2370)
            .feature("position", 0.0)
            .unreadable("momentum"),
        FakeChip::new("zpm", 2004).feature("power", 7e11),
        FakeChip::new("fluxcapacitor", 9309).feature("power", 1.21).feature("speed", 88.0),
        FakeChip::new("fluxcapacitor", 1809).feature("power", 2.21).feature("year", 2035.0),
    ]
}

pub fn reference_backend() -> FakeBackend {
    FakeBackend::new(reference_chips())
}

/// A throwaway `/sys`-like tree with a `class/hwmon` directory
pub struct FakeHwmonTree {
    dir: TempDir,
}

impl FakeHwmonTree {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("class").join("hwmon")).unwrap();
        FakeHwmonTree { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("class").join("hwmon")
    }

    fn chip_dir(&self, class_nr: usize) -> PathBuf {
        self.root().join(format!("hwmon{}", class_nr))
    }

    /// Add `hwmonN` named `name`, optionally backed by `(subsystem, device name)`
    pub fn chip(&self, class_nr: usize, name: &str, device: Option<(&str, &str)>) -> PathBuf {
        let dir = self.chip_dir(class_nr);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("name"), format!("{}\n", name)).unwrap();

        if let Some((subsystem, dev_name)) = device {
            let bus_dir = self.dir.path().join("bus").join(subsystem);
            let dev_dir = self.dir.path().join("devices").join(subsystem).join(dev_name);
            fs::create_dir_all(&bus_dir).unwrap();
            fs::create_dir_all(&dev_dir).unwrap();
            link(&bus_dir, &dev_dir.join("subsystem"));
            link(&dev_dir, &dir.join("device"));
        }
        dir
    }

    pub fn attr(&self, class_nr: usize, attr: &str, content: &str) {
        fs::write(self.chip_dir(class_nr).join(attr), format!("{}\n", content)).unwrap();
    }

    /// An attribute that exists but fails to read
    pub fn unreadable(&self, class_nr: usize, attr: &str) {
        fs::create_dir_all(self.chip_dir(class_nr).join(attr)).unwrap();
    }
}

fn link(target: &Path, at: &Path) {
    if !at.exists() {
        symlink(target, at).unwrap();
    }
}
