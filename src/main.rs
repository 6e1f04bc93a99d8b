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

use std::path::PathBuf;

use anyhow::Context;

use hwmon_readings::config::{self, Settings};
use hwmon_readings::{enumerate_all_sensors, logger, read_sensor, report, SysfsBackend};

const USAGE: &str = "\
usage: hwmon-readings [--root <dir>] [--logging] [command]

commands:
  report                    every feature of every chip with its value (default)
  list [--readable] [--json]
                            canonical sensor names
  read <sensor>             current value of one sensor, e.g. coretemp.temp1
  measure [<sensor>]        vcgencmd-style line, e.g. temp=47.0'C";

#[derive(Debug, PartialEq)]
enum Command {
    Report,
    List { readable: bool, json: bool },
    Read { descriptor: String },
    Measure { descriptor: Option<String> },
    Help,
}

#[derive(Debug, PartialEq)]
struct Cli {
    root: Option<PathBuf>,
    logging: bool,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut root = None;
    let mut logging = false;
    let mut readable = false;
    let mut json = false;
    let mut positional: Vec<&str> = Vec::new();

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--root" => {
                let dir = it.next().ok_or("--root needs a directory")?;
                root = Some(PathBuf::from(dir));
            }
            "--logging" => logging = true,
            "--readable" => readable = true,
            "--json" => json = true,
            "-h" | "--help" => positional.insert(0, "help"),
            s if s.starts_with("--") => return Err(format!("unknown option {}", s)),
            s => positional.push(s),
        }
    }

    let command = match positional.as_slice() {
        [] | ["report"] => Command::Report,
        ["help", ..] => Command::Help,
        ["list"] => Command::List { readable, json },
        ["read", sensor] => Command::Read { descriptor: sensor.to_string() },
        ["read"] => return Err("read needs a sensor name".to_string()),
        ["measure"] => Command::Measure { descriptor: None },
        ["measure", sensor] => Command::Measure { descriptor: Some(sensor.to_string()) },
        [cmd, ..] => return Err(format!("unexpected argument {}", cmd)),
    };
    if (readable || json) && !matches!(command, Command::List { .. } | Command::Help) {
        return Err("--readable and --json only apply to list".to_string());
    }

    Ok(Cli { root, logging, command })
}

// argv may be empty when the process is spawned without argv[0]
fn without_program_name(args: &[String]) -> &[String] {
    args.get(1..).unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let cli = match parse_args(without_program_name(&args)) {
        Ok(cli) => cli,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };
    if cli.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut settings: Settings = config::load_settings().context("loading settings")?;
    if let Some(root) = cli.root.clone() {
        settings.hwmon_root = root;
    }

    if cli.logging {
        logger::init_logging(&settings.log_path());
        logger::log_event("startup", serde_json::json!({
            "args": args,
            "hwmon_root": settings.hwmon_root.display().to_string(),
        }));
    }

    if let Err(err) = run(&cli.command, &settings) {
        eprintln!("error: {err}");
        logger::log_event("fatal_error", serde_json::json!({ "error": err.to_string() }));
        std::process::exit(1);
    }
    Ok(())
}

fn run(command: &Command, settings: &Settings) -> anyhow::Result<()> {
    let backend = SysfsBackend::new(settings.hwmon_root.clone());

    match command {
        Command::Report => {
            let mut sink = report::default_sink(settings.rich_output);
            report::report_all_readings(&backend, sink.as_mut())?;
        }
        Command::List { readable, json } => {
            let sensors = enumerate_all_sensors(&backend, *readable)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&sensors)?);
            } else {
                for sensor in &sensors {
                    println!("{}", sensor);
                }
            }
        }
        Command::Read { descriptor } => {
            let value = read_sensor(&backend, descriptor.as_str())?;
            println!("{}", report::format_reading(value));
        }
        Command::Measure { descriptor } => {
            println!("{}", report::measure(&backend, descriptor.as_deref())?);
        }
        Command::Help => println!("{}", USAGE),
    }
    Ok(())
}
