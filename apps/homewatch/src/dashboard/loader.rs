use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::path::Path;

use super::equitherm::supply_target;
use super::window::resolve_local;
use crate::csv_log::{CsvLog, CLIMATE_HEADER};
use crate::samples::ClimateSample;

pub const DISPLAY_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

const AUX_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A climate sample with its display-side derived columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateRow {
    pub sample: ClimateSample,
    pub local: DateTime<Tz>,
    /// Equithermal supply target for the sample's outdoor temperature.
    pub target: Option<f64>,
}

impl ClimateRow {
    pub fn display_time(&self) -> String {
        self.local.format(DISPLAY_FORMAT).to_string()
    }
}

/// A timestamped scalar from one of the headerless logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub time: DateTime<Tz>,
    pub value: f64,
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("{} not found", path.display());
    }
    Ok(())
}

/// Vendor climate log, ordered by timestamp.
pub fn load_climate(path: &Path, tz: &Tz) -> Result<Vec<ClimateRow>> {
    ensure_exists(path)?;
    let samples: Vec<ClimateSample> = CsvLog::with_header(path, CLIMATE_HEADER).read_lenient()?;
    let mut rows: Vec<ClimateRow> = samples
        .into_iter()
        .filter_map(|sample| {
            let local = Utc.timestamp_opt(sample.timestamp, 0).single()?.with_timezone(tz);
            let target = sample.temp_outdoor.map(supply_target);
            Some(ClimateRow {
                sample,
                local,
                target,
            })
        })
        .collect();
    rows.sort_by_key(|row| row.sample.timestamp);
    Ok(rows)
}

/// Auxiliary-room thermometer log: `%Y-%m-%d %H:%M:%S` local time and a reading, no header.
/// Garbage rows are dropped, then rows are sorted and duplicate timestamps collapsed.
pub fn load_aux_room(path: &Path, tz: &Tz) -> Result<Vec<Reading>> {
    ensure_exists(path)?;
    let records = CsvLog::headerless(path).read_records()?;
    let mut readings: Vec<Reading> = records
        .iter()
        .filter_map(|record| {
            let naive = NaiveDateTime::parse_from_str(record.get(0)?, AUX_TIME_FORMAT).ok()?;
            let value = parse_value(record.get(1)?)?;
            let time = resolve_local(tz, naive).ok()?;
            Some(Reading { time, value })
        })
        .collect();
    readings.sort_by_key(|reading| reading.time);
    readings.dedup_by_key(|reading| reading.time);
    Ok(readings)
}

/// Boiler supply-temperature log: `Time, Value`, no header. Times may be naive local or RFC 3339.
pub fn load_boiler_output(path: &Path, tz: &Tz) -> Result<Vec<Reading>> {
    ensure_exists(path)?;
    let records = CsvLog::headerless(path).read_records()?;
    let mut readings: Vec<Reading> = records
        .iter()
        .filter_map(|record| {
            let time = parse_flexible_time(record.get(0)?, tz)?;
            let value = parse_value(record.get(1)?)?;
            Some(Reading { time, value })
        })
        .collect();
    readings.sort_by_key(|reading| reading.time);
    Ok(readings)
}

fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_flexible_time(raw: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(tz));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|naive| resolve_local(tz, naive).ok())
}
