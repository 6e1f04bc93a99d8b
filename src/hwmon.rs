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

//! Hardware-access layer: detected chips, their features, and value reads.
//!
//! [`SensorBackend`] is the seam the catalog and resolver talk to. All access
//! goes through a [`Session`], which initializes the backend when opened and
//! cleans it up when dropped. [`SysfsBackend`] is the Linux implementation on
//! top of `/sys/class/hwmon`.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::error::{AccessReason, Result, SensorAccessError, SensorError};
use crate::logger;

pub const DEFAULT_HWMON_ROOT: &str = "/sys/class/hwmon";

/// Kind of measurement a feature exposes. Declaration order is the order
/// features are reported within a chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    In,
    Fan,
    Temp,
    Power,
    Energy,
    Curr,
    Humidity,
    Intrusion,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 8] = [
        FeatureKind::In,
        FeatureKind::Fan,
        FeatureKind::Temp,
        FeatureKind::Power,
        FeatureKind::Energy,
        FeatureKind::Curr,
        FeatureKind::Humidity,
        FeatureKind::Intrusion,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            FeatureKind::In => "in",
            FeatureKind::Fan => "fan",
            FeatureKind::Temp => "temp",
            FeatureKind::Power => "power",
            FeatureKind::Energy => "energy",
            FeatureKind::Curr => "curr",
            FeatureKind::Humidity => "humidity",
            FeatureKind::Intrusion => "intrusion",
        }
    }

    /// Attribute suffixes holding the main value, most preferred first.
    pub fn input_suffixes(self) -> &'static [&'static str] {
        match self {
            FeatureKind::Power => &["_input", "_average"],
            FeatureKind::Intrusion => &["_alarm"],
            _ => &["_input"],
        }
    }

    /// Divisor turning the raw sysfs integer into base units.
    pub fn scale(self) -> f64 {
        match self {
            FeatureKind::In | FeatureKind::Temp | FeatureKind::Curr | FeatureKind::Humidity => 1000.0,
            FeatureKind::Power | FeatureKind::Energy => 1_000_000.0,
            FeatureKind::Fan | FeatureKind::Intrusion => 1.0,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            FeatureKind::In => "V",
            FeatureKind::Fan => "RPM",
            FeatureKind::Temp => "'C",
            FeatureKind::Power => "W",
            FeatureKind::Energy => "J",
            FeatureKind::Curr => "A",
            FeatureKind::Humidity => "%RH",
            FeatureKind::Intrusion => "",
        }
    }

    /// Kind of a feature named like `temp1` or `in0`.
    pub fn from_feature_name(name: &str) -> Option<FeatureKind> {
        FeatureKind::ALL
            .into_iter()
            .find(|k| extract_index(name, k.prefix(), "").is_some())
    }
}

/// Bus a chip hangs off, derived from the sysfs `device` link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusKind {
    I2c,
    Isa,
    Pci,
    Spi,
    Virtual,
    Acpi,
    Hid,
    Mdio,
    Scsi,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// e.g. `temp1`
    pub name: String,
    pub kind: FeatureKind,
    /// Contents of the `<name>_label` attribute, if the driver provides one.
    pub label: Option<String>,
    /// Attribute file holding the value, relative to the chip directory.
    pub attribute: String,
}

impl Feature {
    /// Feature whose value lives in the default attribute for its kind.
    pub fn new(kind: FeatureKind, number: u32) -> Self {
        let name = format!("{}{}", kind.prefix(), number);
        let attribute = format!("{}{}", name, kind.input_suffixes()[0]);
        Feature { name, kind, label: None, attribute }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chip {
    /// Chip prefix as reported by the driver, undecoded.
    pub prefix: Vec<u8>,
    pub address: i64,
    pub bus: BusKind,
    pub path: PathBuf,
    pub features: Vec<Feature>,
}

impl Chip {
    pub fn label(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.prefix)
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }
}

/// Lifecycle and access calls of a hardware-monitoring layer.
///
/// `detected_chips` and `read_value` are only meaningful between `init` and
/// `cleanup`; use [`Session`] rather than calling these directly.
#[cfg_attr(test, mockall::automock)]
pub trait SensorBackend {
    fn init(&self) -> Result<()>;
    fn cleanup(&self);
    /// Chips in the layer's stable traversal order.
    fn detected_chips(&self) -> Result<Vec<Chip>>;
    /// Current value of `feature`. Refusals are `SensorError::Access`.
    fn read_value(&self, chip: &Chip, feature: &Feature) -> Result<f64>;
}

/// Scoped acquisition of a [`SensorBackend`].
pub struct Session<'a, B: SensorBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: SensorBackend + ?Sized> Session<'a, B> {
    pub fn open(backend: &'a B) -> Result<Self> {
        if let Err(e) = backend.init() {
            backend.cleanup();
            return Err(e);
        }
        logger::log_event("session_open", json!({}));
        Ok(Session { backend })
    }

    pub fn chips(&self) -> Result<Vec<Chip>> {
        self.backend.detected_chips()
    }

    pub fn read(&self, chip: &Chip, feature: &Feature) -> Result<f64> {
        self.backend.read_value(chip, feature)
    }
}

impl<B: SensorBackend + ?Sized> Drop for Session<'_, B> {
    fn drop(&mut self) {
        self.backend.cleanup();
        logger::log_event("session_close", json!({}));
    }
}

/// Linux hwmon class backend. `init` snapshots the chip list; `cleanup` drops it.
#[derive(Debug)]
pub struct SysfsBackend {
    root: PathBuf,
    snapshot: RefCell<Option<Vec<Chip>>>,
}

impl SysfsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SysfsBackend { root: root.into(), snapshot: RefCell::new(None) }
    }
}

impl Default for SysfsBackend {
    fn default() -> Self {
        SysfsBackend::new(DEFAULT_HWMON_ROOT)
    }
}

impl SensorBackend for SysfsBackend {
    fn init(&self) -> Result<()> {
        let chips = scan_chips(&self.root)?;
        *self.snapshot.borrow_mut() = Some(chips);
        Ok(())
    }

    fn cleanup(&self) {
        self.snapshot.borrow_mut().take();
    }

    fn detected_chips(&self) -> Result<Vec<Chip>> {
        self.snapshot.borrow().clone().ok_or(SensorError::NotInitialized)
    }

    fn read_value(&self, chip: &Chip, feature: &Feature) -> Result<f64> {
        if self.snapshot.borrow().is_none() {
            return Err(SensorError::NotInitialized);
        }
        read_feature_value(chip, feature).map_err(|reason| {
            SensorError::Access(SensorAccessError {
                chip: chip.label().into_owned(),
                feature: feature.name.clone(),
                reason,
            })
        })
    }
}

/// Walk `root` and describe every hwmon chip, ordered by class number.
/// A missing root means no chips.
pub fn scan_chips(root: &Path) -> io::Result<Vec<Chip>> {
    let entries = match fs::read_dir(root) {
        Ok(it) => it,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut dirs: Vec<(usize, PathBuf)> = entries
        .flatten()
        .filter_map(|ent| {
            let fname = ent.file_name();
            let idx = extract_index(&fname.to_string_lossy(), "hwmon", "")?;
            Some((idx, ent.path()))
        })
        .collect();
    dirs.sort_by_key(|(idx, _)| *idx);

    let mut chips = Vec::new();
    for (class_nr, path) in dirs {
        // Resolve to the actual device dir in case of symlink
        let dir = fs::canonicalize(&path).unwrap_or(path);
        match read_chip(&dir, class_nr)? {
            Some(chip) => {
                logger::log_event(
                    "chip_found",
                    json!({
                        "chip": chip.label(),
                        "bus": format!("{:?}", chip.bus),
                        "address": chip.address,
                        "features": chip.features.len(),
                    }),
                );
                chips.push(chip)
            }
            None => logger::log_event(
                "chip_skipped",
                json!({ "path": dir.display().to_string(), "reason": "no name attribute" }),
            ),
        }
    }
    Ok(chips)
}

fn read_chip(dir: &Path, class_nr: usize) -> io::Result<Option<Chip>> {
    // Older drivers keep their attributes on the parent device
    let attr_dir = if dir.join("name").is_file() {
        dir.to_path_buf()
    } else if dir.join("device").join("name").is_file() {
        dir.join("device")
    } else {
        return Ok(None);
    };
    let prefix = match read_trimmed_bytes(attr_dir.join("name")) {
        Ok(p) if !p.is_empty() => p,
        _ => return Ok(None),
    };

    let (bus, address) = device_address(dir).unwrap_or((BusKind::Virtual, class_nr as i64));
    let features = scan_features(&attr_dir)?;

    Ok(Some(Chip { prefix, address, bus, path: attr_dir, features }))
}

fn device_address(dir: &Path) -> Option<(BusKind, i64)> {
    let device = fs::canonicalize(dir.join("device")).ok()?;
    let dev_name = device.file_name()?.to_string_lossy().into_owned();
    let subsystem = fs::canonicalize(device.join("subsystem"))
        .ok()
        .and_then(|p| p.file_name().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default();
    Some(parse_device_address(&subsystem, &dev_name))
}

/// Bus and address for a device named `dev_name` on `subsystem`, using the
/// lm-sensors conventions for each bus.
pub fn parse_device_address(subsystem: &str, dev_name: &str) -> (BusKind, i64) {
    match subsystem {
        // BUS-ADDR; the bus number sits above the 16-bit client address
        "i2c" => {
            let addr = dev_name.split_once('-').and_then(|(bus, addr)| {
                let bus = bus.parse::<i64>().ok()?;
                let addr = i64::from_str_radix(addr, 16).ok()?;
                Some((bus << 16) + addr)
            });
            (BusKind::I2c, addr.unwrap_or(0))
        }
        "spi" => {
            let addr = dev_name
                .strip_prefix("spi")
                .and_then(|rest| rest.split_once('.'))
                .and_then(|(_, cs)| cs.parse::<i64>().ok());
            (BusKind::Spi, addr.unwrap_or(0))
        }
        "pci" => (BusKind::Pci, parse_pci_address(dev_name).unwrap_or(0)),
        "hid" => {
            let addr = dev_name
                .rsplit_once('.')
                .and_then(|(_, id)| i64::from_str_radix(id, 16).ok());
            (BusKind::Hid, addr.unwrap_or(0))
        }
        "platform" | "of_platform" | "isa" => {
            let addr = dev_name
                .rsplit_once('.')
                .and_then(|(_, n)| n.parse::<i64>().ok());
            (BusKind::Isa, addr.unwrap_or(0))
        }
        "acpi" => {
            let addr = dev_name
                .rsplit_once(':')
                .and_then(|(_, n)| n.parse::<i64>().ok());
            (BusKind::Acpi, addr.unwrap_or(0))
        }
        "mdio_bus" => (BusKind::Mdio, trailing_number(dev_name, 16).unwrap_or(0)),
        "scsi" => (
            BusKind::Scsi,
            parse_scsi_address(dev_name)
                .or_else(|| trailing_number(dev_name, 10))
                .unwrap_or(0),
        ),
        _ => (BusKind::Other, trailing_number(dev_name, 10).unwrap_or(0)),
    }
}

// HOST:CHANNEL:TARGET:LUN
fn parse_scsi_address(dev_name: &str) -> Option<i64> {
    let mut parts = dev_name.split(':').map(|p| p.parse::<i64>().ok());
    let host = parts.next()??;
    let channel = parts.next()??;
    let target = parts.next()??;
    let lun = parts.next()??;
    if parts.next().is_some() {
        return None;
    }
    Some((host << 32) + (channel << 24) + (target << 16) + lun)
}

// DDDD:BB:SS.F
fn parse_pci_address(dev_name: &str) -> Option<i64> {
    let mut parts = dev_name.split(':');
    let domain = i64::from_str_radix(parts.next()?, 16).ok()?;
    let bus = i64::from_str_radix(parts.next()?, 16).ok()?;
    let (slot, func) = parts.next()?.split_once('.')?;
    if parts.next().is_some() {
        return None;
    }
    let slot = i64::from_str_radix(slot, 16).ok()?;
    let func = i64::from_str_radix(func, 16).ok()?;
    Some((domain << 16) + (bus << 8) + (slot << 3) + func)
}

fn trailing_number(s: &str, radix: u32) -> Option<i64> {
    let start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_digit(radix))
        .last()
        .map(|(i, _)| i)?;
    i64::from_str_radix(&s[start..], radix).ok()
}

fn scan_features(dir: &Path) -> io::Result<Vec<Feature>> {
    let mut found: BTreeMap<(FeatureKind, u32), Feature> = BTreeMap::new();

    for file in fs::read_dir(dir)?.flatten() {
        let fname = file.file_name();
        let fname = fname.to_string_lossy();
        for kind in FeatureKind::ALL {
            for (rank, suffix) in kind.input_suffixes().iter().enumerate() {
                let Some(idx) = extract_index(&fname, kind.prefix(), suffix) else { continue };
                let number = idx as u32;
                let replace = match found.get(&(kind, number)) {
                    Some(existing) => kind
                        .input_suffixes()
                        .iter()
                        .position(|s| existing.attribute.ends_with(s))
                        .map_or(true, |existing_rank| rank < existing_rank),
                    None => true,
                };
                if replace {
                    let name = format!("{}{}", kind.prefix(), number);
                    let label = read_trimmed(dir.join(format!("{}_label", name))).ok();
                    found.insert(
                        (kind, number),
                        Feature { name, kind, label, attribute: fname.to_string() },
                    );
                }
            }
        }
    }

    Ok(found.into_values().collect())
}

fn read_feature_value(chip: &Chip, feature: &Feature) -> std::result::Result<f64, AccessReason> {
    let raw = read_trimmed(chip.path.join(&feature.attribute)).map_err(AccessReason::from_io)?;
    let value = raw
        .parse::<i64>()
        .map(|v| v as f64)
        .or_else(|_| raw.parse::<f64>())
        .map_err(|_| AccessReason::Malformed(raw.clone()))?;
    Ok(value / feature.kind.scale())
}

fn read_trimmed<P: AsRef<Path>>(p: P) -> io::Result<String> {
    let mut s = String::new();
    fs::File::open(p)?.read_to_string(&mut s)?;
    Ok(s.trim().to_string())
}

fn read_trimmed_bytes<P: AsRef<Path>>(p: P) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    fs::File::open(p)?.read_to_end(&mut buf)?;
    let end = buf.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(0, |i| i + 1);
    let start = buf[..end].iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(end);
    Ok(buf[start..end].to_vec())
}

/// Number between `prefix` and `suffix` in a sysfs attribute name, e.g.
/// `extract_index("fan1_input", "fan", "_input") == Some(1)`.
pub fn extract_index(fname: &str, prefix: &str, suffix: &str) -> Option<usize> {
    if fname.len() > prefix.len() + suffix.len()
        && fname.starts_with(prefix)
        && fname.ends_with(suffix)
    {
        let mid = &fname[prefix.len()..fname.len() - suffix.len()];
        if !mid.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        mid.parse().ok()
    } else {
        None
    }
}
