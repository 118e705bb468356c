use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Counter32 rolls over at 2^32.
pub const COUNTER32_MODULUS: u64 = 1 << 32;

const BINARY_MEGABYTE: f64 = 1024.0 * 1024.0;
const DECIMAL_MEGABYTE: f64 = 1_000_000.0;
const MILLIS_PER_TICK: f64 = 10.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteUnit {
    #[default]
    Binary,
    Decimal,
}

impl ByteUnit {
    fn divisor(self) -> f64 {
        match self {
            ByteUnit::Binary => BINARY_MEGABYTE,
            ByteUnit::Decimal => DECIMAL_MEGABYTE,
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Soft parse of a raw counter reading. Floats are truncated, anything else is unknown.
pub fn parse_counter(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<u64>() {
        return Some(value);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value.trunc() as u64),
        _ => None,
    }
}

/// Bytes transferred since `previous`, accounting for a single counter wrap.
///
/// Without a previous reading the current value is treated as an absolute total.
pub fn delta_bytes(current: Option<u64>, previous: Option<u64>, modulus: u64) -> Option<u64> {
    let current = current?;
    let Some(previous) = previous else {
        return Some(current);
    };
    if current >= previous {
        Some(current - previous)
    } else {
        Some(modulus.saturating_sub(previous).saturating_add(current))
    }
}

pub fn bytes_to_units(bytes: Option<u64>, unit: ByteUnit) -> Option<f64> {
    bytes.map(|value| round2(value as f64 / unit.divisor()))
}

/// sysUpTime ticks (hundredths of a second) to hours.
pub fn ticks_to_hours(ticks: Option<u64>) -> Option<f64> {
    ticks.map(|value| round2(value as f64 * MILLIS_PER_TICK / MILLIS_PER_HOUR))
}

pub fn detect_restart(current_uptime: Option<f64>, previous_uptime: Option<f64>) -> bool {
    match (current_uptime, previous_uptime) {
        (Some(current), Some(previous)) => current < previous,
        _ => false,
    }
}

/// One SNMP read of the router, before any normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficSample {
    pub timestamp: NaiveDateTime,
    pub raw_in: Option<u64>,
    pub raw_out: Option<u64>,
    pub uptime_hours: Option<f64>,
}

/// Persisted between traffic poll cycles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PollerState {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub isp_in: Option<u64>,
    #[serde(default)]
    pub lan_out: Option<u64>,
    #[serde(default)]
    pub uptime: Option<f64>,
}

pub const STATE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl PollerState {
    pub fn from_sample(sample: &TrafficSample) -> Self {
        Self {
            timestamp: Some(sample.timestamp.format(STATE_TIMESTAMP_FORMAT).to_string()),
            isp_in: sample.raw_in,
            lan_out: sample.raw_out,
            uptime: sample.uptime_hours,
        }
    }

    fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.as_deref()?;
        NaiveDateTime::parse_from_str(raw.trim(), STATE_TIMESTAMP_FORMAT).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficDelta {
    pub timestamp: NaiveDateTime,
    pub in_mb_total: Option<f64>,
    pub out_mb_total: Option<f64>,
    pub uptime_hours: Option<f64>,
    pub delta_in_mb: Option<f64>,
    pub delta_out_mb: Option<f64>,
    pub delta_time_hours: Option<f64>,
    pub restart_detected: bool,
}

impl TrafficDelta {
    pub fn compute(
        sample: &TrafficSample,
        previous: Option<&PollerState>,
        unit: ByteUnit,
        modulus: u64,
    ) -> Self {
        let delta_time_hours = previous
            .and_then(PollerState::parsed_timestamp)
            .map(|prev| round2((sample.timestamp - prev).num_seconds() as f64 / 3600.0));

        let restart_detected =
            detect_restart(sample.uptime_hours, previous.and_then(|state| state.uptime));

        // Counters reset together with uptime, so a wrap-style delta would be garbage.
        let (delta_in_mb, delta_out_mb) = if restart_detected {
            (None, None)
        } else {
            let prev_in = previous.and_then(|state| state.isp_in);
            let prev_out = previous.and_then(|state| state.lan_out);
            (
                bytes_to_units(delta_bytes(sample.raw_in, prev_in, modulus), unit),
                bytes_to_units(delta_bytes(sample.raw_out, prev_out, modulus), unit),
            )
        };

        Self {
            timestamp: sample.timestamp,
            in_mb_total: bytes_to_units(sample.raw_in, unit),
            out_mb_total: bytes_to_units(sample.raw_out, unit),
            uptime_hours: sample.uptime_hours,
            delta_in_mb,
            delta_out_mb,
            delta_time_hours,
            restart_detected,
        }
    }
}
