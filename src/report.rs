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

use std::io::{self, IsTerminal, Write};

use crossterm::style::Stylize;

use crate::config::RichOutput;
use crate::error::{LookupError, Result, SensorError};
use crate::hwmon::{Feature, FeatureKind, SensorBackend, Session};
use crate::sensors::{enumerate_all_sensors, read_sensor, resolve_descriptor, SensorIdentity};

/// Where report lines go.
pub trait ReportSink {
    fn line(&mut self, label: &str, feature: &Feature, value: Option<f64>) -> io::Result<()>;
}

/// Unstyled `- label:feature : value` lines.
pub struct PlainSink<W: Write> {
    out: W,
}

impl<W: Write> PlainSink<W> {
    pub fn new(out: W) -> Self {
        PlainSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for PlainSink<W> {
    fn line(&mut self, label: &str, feature: &Feature, value: Option<f64>) -> io::Result<()> {
        writeln!(self.out, "{}", format_line(label, &feature.name, value))
    }
}

/// Same lines, styled for an interactive terminal, with the driver's own
/// feature label appended when it has one.
pub struct RichSink<W: Write> {
    out: W,
}

impl<W: Write> RichSink<W> {
    pub fn new(out: W) -> Self {
        RichSink { out }
    }
}

impl<W: Write> ReportSink for RichSink<W> {
    fn line(&mut self, label: &str, feature: &Feature, value: Option<f64>) -> io::Result<()> {
        let value = match value {
            Some(_) => format_value(value).green(),
            None => format_value(value).dark_grey(),
        };
        write!(
            self.out,
            "{} {}:{} : {}",
            "-".dark_grey(),
            label.cyan().bold(),
            feature.name.as_str().bold(),
            value
        )?;
        match &feature.label {
            Some(name) => writeln!(self.out, " {}", format!("({})", name).dark_grey()),
            None => writeln!(self.out),
        }
    }
}

/// Rich output for terminals unless `NO_COLOR` is set, plain otherwise.
pub fn default_sink(mode: RichOutput) -> Box<dyn ReportSink> {
    let stdout = io::stdout();
    let rich = match mode {
        RichOutput::Always => true,
        RichOutput::Never => false,
        RichOutput::Auto => stdout.is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    };
    if rich {
        Box::new(RichSink::new(stdout))
    } else {
        Box::new(PlainSink::new(stdout))
    }
}

pub fn format_line(label: &str, feature: &str, value: Option<f64>) -> String {
    format!("- {}:{} : {}", label, feature, format_value(value))
}

/// Shortest round-trip form, always with a decimal point: 45.0, -273.15
pub fn format_reading(value: f64) -> String {
    format!("{:?}", value)
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "None".to_string(), format_reading)
}

/// Write one line per feature of every detected chip. Unreadable features
/// show `None`. Returns the number of lines written.
pub fn report_all_readings<B>(backend: &B, sink: &mut dyn ReportSink) -> Result<usize>
where
    B: SensorBackend + ?Sized,
{
    let session = Session::open(backend)?;
    let mut lines = 0;
    for chip in session.chips()? {
        let label = chip.label();
        for feature in &chip.features {
            let value = match session.read(&chip, feature) {
                Ok(v) => Some(v),
                Err(SensorError::Access(_)) => None,
                Err(e) => return Err(e),
            };
            sink.line(&label, feature, value)?;
            lines += 1;
        }
    }
    Ok(lines)
}

/// `vcgencmd measure_temp` style line for one sensor, e.g. `temp=47.0'C`.
///
/// Without a descriptor the first readable temperature sensor is used.
pub fn measure<B>(backend: &B, descriptor: Option<&str>) -> Result<String>
where
    B: SensorBackend + ?Sized,
{
    let sensor: SensorIdentity = match descriptor {
        Some(d) => resolve_descriptor(backend, d)?,
        None => enumerate_all_sensors(backend, true)?
            .into_iter()
            .find(|s| FeatureKind::from_feature_name(&s.feature_name) == Some(FeatureKind::Temp))
            .ok_or(LookupError::NoTemperatureSensor)?,
    };
    let value = read_sensor(backend, &sensor)?;
    Ok(measure_line(FeatureKind::from_feature_name(&sensor.feature_name), value))
}

pub fn measure_line(kind: Option<FeatureKind>, value: f64) -> String {
    match kind {
        Some(FeatureKind::Temp) => format!("temp={:.1}{}", value, FeatureKind::Temp.unit()),
        Some(FeatureKind::In) => format!("volt={:.4}{}", value, FeatureKind::In.unit()),
        Some(FeatureKind::Fan) => format!("fan={:.0}{}", value, FeatureKind::Fan.unit()),
        Some(kind) => format!("{}={}{}", kind.prefix(), value, kind.unit()),
        None => format!("value={}", value),
    }
}
