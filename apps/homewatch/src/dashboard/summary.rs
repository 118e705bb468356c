use super::loader::{ClimateRow, DISPLAY_FORMAT};
use super::transitions::{detect_transitions, latest, TransitionKind};

const NOT_AVAILABLE: &str = "N/A";

/// Latest readings plus the most recent boiler start/stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub last_sample: Option<String>,
    pub temp_outdoor: Option<f64>,
    pub pressure: Option<f64>,
    pub last_start: Option<String>,
    pub last_stop: Option<String>,
    /// True when the start happened after the stop (or there was no stop).
    pub start_is_newer: bool,
}

impl StatusSummary {
    pub fn from_rows(rows: &[ClimateRow]) -> Self {
        let states: Vec<Option<bool>> = rows.iter().map(|row| row.sample.boiler).collect();
        let transitions = detect_transitions(&states);
        let start_idx = latest(&transitions, TransitionKind::Start);
        let stop_idx = latest(&transitions, TransitionKind::Stop);
        let at = |idx: Option<usize>| idx.and_then(|i| rows.get(i)).map(ClimateRow::display_time);

        let last = rows.last();
        Self {
            last_sample: last.map(ClimateRow::display_time),
            temp_outdoor: last.and_then(|row| row.sample.temp_outdoor),
            pressure: last.and_then(|row| row.sample.pressure),
            last_start: at(start_idx),
            last_stop: at(stop_idx),
            start_is_newer: start_idx.unwrap_or(0) >= stop_idx.unwrap_or(0),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let start = format!(
            "Last boiler start: {}",
            self.last_start.as_deref().unwrap_or(NOT_AVAILABLE)
        );
        let stop = format!(
            "Last boiler stop: {}",
            self.last_stop.as_deref().unwrap_or(NOT_AVAILABLE)
        );
        let mut lines = vec![
            format!(
                "Last sample: {}",
                self.last_sample.as_deref().unwrap_or(NOT_AVAILABLE)
            ),
            format!("Outdoor temperature: {}", fmt_unit(self.temp_outdoor, " °C")),
            format!("Pressure: {}", fmt_unit(self.pressure, " hPa")),
        ];
        if self.start_is_newer {
            lines.extend([start, stop]);
        } else {
            lines.extend([stop, start]);
        }
        lines
    }
}

/// One rendered row of the tail table.
#[derive(Debug, Clone, PartialEq)]
pub struct TailRow {
    pub time: String,
    pub temp_outdoor: String,
    pub pressure: String,
    pub temp_indoor: String,
    pub setpoint: String,
    pub target: String,
    pub boiler: String,
}

pub const TAIL_COLUMNS: &[&str] = &[
    "Time",
    "Outdoor °C",
    "Pressure hPa",
    "Indoor °C",
    "Setpoint °C",
    "Target °C",
    "Boiler",
];

impl TailRow {
    pub fn cells(&self) -> [&str; 7] {
        [
            self.time.as_str(),
            self.temp_outdoor.as_str(),
            self.pressure.as_str(),
            self.temp_indoor.as_str(),
            self.setpoint.as_str(),
            self.target.as_str(),
            self.boiler.as_str(),
        ]
    }
}

/// The last `count` samples, oldest first.
pub fn tail_rows(rows: &[ClimateRow], count: usize) -> Vec<TailRow> {
    let skip = rows.len().saturating_sub(count);
    rows[skip..]
        .iter()
        .map(|row| TailRow {
            time: row.local.format(DISPLAY_FORMAT).to_string(),
            temp_outdoor: fmt_value(row.sample.temp_outdoor),
            pressure: fmt_value(row.sample.pressure),
            temp_indoor: fmt_value(row.sample.temp_indoor),
            setpoint: fmt_value(row.sample.setpoint),
            target: fmt_value(row.target),
            boiler: match row.sample.boiler {
                Some(true) => "on".to_string(),
                Some(false) => "off".to_string(),
                None => String::new(),
            },
        })
        .collect()
}

fn fmt_value(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_default()
}

fn fmt_unit(value: Option<f64>, unit: &str) -> String {
    value
        .map(|v| format!("{v:.1}{unit}"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
