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

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serde_json::{json, Value};

pub const FALLBACK_LOG_PATH: &str = "/tmp/hwmon-readings.log.json";

lazy_static! {
    static ref LOG_FILE: Mutex<Option<(PathBuf, File)>> = Mutex::new(None);
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn open_append(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Start appending events to `path`, or to the /tmp fallback if it can't be opened.
/// Returns the path actually in use.
pub fn init_logging(path: &Path) -> Option<PathBuf> {
    let (used, file) = match open_append(path) {
        Some(f) => (path.to_path_buf(), f),
        None => {
            let fallback = PathBuf::from(FALLBACK_LOG_PATH);
            let f = open_append(&fallback)?;
            (fallback, f)
        }
    };
    match LOG_FILE.lock() {
        Ok(mut guard) => *guard = Some((used.clone(), file)),
        Err(poisoned) => *poisoned.into_inner() = Some((used.clone(), file)),
    }
    Some(used)
}

pub fn shutdown_logging() {
    match LOG_FILE.lock() {
        Ok(mut guard) => *guard = None,
        Err(poisoned) => *poisoned.into_inner() = None,
    }
}

/// Append one JSON line. No-op until `init_logging` has been called.
pub fn log_event(event: &str, data: Value) {
    let Ok(mut guard) = LOG_FILE.lock() else { return };
    let Some((_, f)) = guard.as_mut() else { return };
    let line = json!({
        "ts_ms": now_millis(),
        "event": event,
        "data": data,
    })
    .to_string();
    let _ = writeln!(f, "{}", line);
}
