use serde::{Deserialize, Serialize};

use crate::counters::TrafficDelta;
use crate::csv_log::flexible_bool;

/// One thermostat reading. Column order matches the climate log header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSample {
    /// Epoch seconds, UTC.
    pub timestamp: i64,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub temp_indoor: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub temp_outdoor: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub setpoint: Option<f64>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub boiler: Option<bool>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pressure: Option<f64>,
}

/// One weather-station reading. Column order matches the station log header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSample {
    pub timestamp: String,
    pub temp_indoor: Option<f64>,
    pub humidity_indoor: Option<f64>,
    pub co2: Option<f64>,
    pub pressure: Option<f64>,
    pub temp_outdoor: Option<f64>,
    pub humidity_outdoor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTrafficRow {
    pub time: String,
    pub raw_in: Option<u64>,
    pub raw_out: Option<u64>,
    pub uptime_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaTrafficRow {
    pub time: String,
    pub in_mb: Option<f64>,
    pub out_mb: Option<f64>,
    pub uptime_hours: Option<f64>,
    pub delta_in_mb: Option<f64>,
    pub delta_out_mb: Option<f64>,
    pub delta_time_hours: Option<f64>,
    pub restart: bool,
}

impl DeltaTrafficRow {
    pub fn from_delta(delta: &TrafficDelta, time: String) -> Self {
        Self {
            time,
            in_mb: delta.in_mb_total,
            out_mb: delta.out_mb_total,
            uptime_hours: delta.uptime_hours,
            delta_in_mb: delta.delta_in_mb,
            delta_out_mb: delta.delta_out_mb,
            delta_time_hours: delta.delta_time_hours,
            restart: delta.restart_detected,
        }
    }
}
