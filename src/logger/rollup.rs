use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

/// Append-only text logs: one line per reading plus hourly and daily
/// averages.
#[derive(Debug, Clone)]
pub struct LogFiles {
    raw: PathBuf,
    hourly: PathBuf,
    daily: PathBuf,
}

impl LogFiles {
    pub fn new(raw: PathBuf, hourly: PathBuf, daily: PathBuf) -> Result<Self> {
        for path in [&raw, &hourly, &daily] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create log directory {}", parent.display())
                    })?;
                }
            }
        }

        Ok(Self { raw, hourly, daily })
    }

    pub fn append_reading(&self, at: NaiveDateTime, value: f64) -> Result<()> {
        append_line(&self.raw, &format_reading(at, value))
    }

    pub fn append_hourly(&self, at: NaiveDateTime, average: f64) -> Result<()> {
        append_line(&self.hourly, &format_hourly(at, average))
    }

    pub fn append_daily(&self, at: NaiveDateTime, average: f64) -> Result<()> {
        append_line(&self.daily, &format_daily(at, average))
    }
}

/// `YYYY-MM-DD HH:MM:SS <value>`
pub fn format_reading(at: NaiveDateTime, value: f64) -> String {
    format!("{} {value:.6}", at.format("%Y-%m-%d %H:%M:%S"))
}

/// `YYYY-MM-DD HH:00 <avg>`
pub fn format_hourly(at: NaiveDateTime, average: f64) -> String {
    format!("{} {average:.6}", at.format("%Y-%m-%d %H:00"))
}

/// `YYYY-MM-DD <avg>`
pub fn format_daily(at: NaiveDateTime, average: f64) -> String {
    format!("{} {average:.6}", at.format("%Y-%m-%d"))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{line}").with_context(|| format!("failed to append to {}", path.display()))
}
