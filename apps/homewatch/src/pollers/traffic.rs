use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::Config;
use crate::counters::{
    ticks_to_hours, ByteUnit, PollerState, TrafficDelta, TrafficSample, STATE_TIMESTAMP_FORMAT,
};
use crate::csv_log::{CsvLog, DELTA_TRAFFIC_HEADER, RAW_TRAFFIC_HEADER};
use crate::samples::{DeltaTrafficRow, RawTrafficRow};
use crate::snmp_source::CounterSource;
use crate::store::JsonStore;

pub struct TrafficPoller<S> {
    source: S,
    raw_log: CsvLog,
    delta_log: CsvLog,
    state: JsonStore<PollerState>,
    timezone: Tz,
    unit: ByteUnit,
    modulus: u64,
}

impl<S: CounterSource> TrafficPoller<S> {
    pub fn new(source: S, config: &Config) -> Self {
        Self {
            source,
            raw_log: CsvLog::with_header(&config.paths.traffic_raw_log, RAW_TRAFFIC_HEADER),
            delta_log: CsvLog::with_header(&config.paths.traffic_delta_log, DELTA_TRAFFIC_HEADER),
            state: JsonStore::new(&config.paths.traffic_state),
            timezone: config.timezone,
            unit: config.snmp.byte_unit,
            modulus: config.snmp.counter_modulus,
        }
    }

    pub fn run_once(&mut self, now: DateTime<Utc>) -> Result<TrafficDelta> {
        let counters = self.source.read_counters()?;
        let sample = TrafficSample {
            timestamp: now.with_timezone(&self.timezone).naive_local(),
            raw_in: counters.raw_in,
            raw_out: counters.raw_out,
            uptime_hours: ticks_to_hours(counters.uptime_ticks),
        };

        let previous = self.state.load().context("failed to load traffic state")?;
        if previous.is_none() {
            tracing::info!(path = %self.state.path().display(), "no traffic state yet; first cycle");
        }
        let delta = TrafficDelta::compute(&sample, previous.as_ref(), self.unit, self.modulus);
        if delta.restart_detected {
            tracing::warn!(
                uptime_hours = ?sample.uptime_hours,
                previous_uptime = ?previous.as_ref().and_then(|s| s.uptime),
                "router restart detected; deltas suppressed"
            );
        }

        let time = sample.timestamp.format(STATE_TIMESTAMP_FORMAT).to_string();
        self.raw_log.append(&RawTrafficRow {
            time: time.clone(),
            raw_in: sample.raw_in,
            raw_out: sample.raw_out,
            uptime_hours: sample.uptime_hours,
        })?;
        self.delta_log
            .append(&DeltaTrafficRow::from_delta(&delta, time))?;
        self.state
            .save(&PollerState::from_sample(&sample))
            .context("failed to save traffic state")?;

        tracing::info!(
            delta_in_mb = ?delta.delta_in_mb,
            delta_out_mb = ?delta.delta_out_mb,
            delta_time_hr = ?delta.delta_time_hours,
            "traffic poll recorded"
        );
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PollError;
    use crate::config::test_config;
    use crate::snmp_source::RouterCounters;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    struct ScriptedRouter {
        reads: VecDeque<Result<RouterCounters>>,
    }

    impl CounterSource for ScriptedRouter {
        fn read_counters(&mut self) -> Result<RouterCounters> {
            self.reads.pop_front().expect("no scripted read left")
        }
    }

    fn counters(raw_in: u64, raw_out: u64, uptime_ticks: u64) -> Result<RouterCounters> {
        Ok(RouterCounters {
            raw_in: Some(raw_in),
            raw_out: Some(raw_out),
            uptime_ticks: Some(uptime_ticks),
        })
    }

    fn utc(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap()
    }

    const MB: u64 = 1_048_576;

    #[test]
    fn cycles_append_rows_and_track_state() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let reads = VecDeque::from(vec![
            counters(10 * MB, 2 * MB, 360_000),
            counters(15 * MB, 3 * MB, 720_000),
            counters(MB, MB, 36_000),
        ]);
        let mut poller = TrafficPoller::new(ScriptedRouter { reads }, &config);

        let first = poller.run_once(utc(9)).unwrap();
        assert_eq!(first.delta_in_mb, Some(10.0));
        assert_eq!(first.delta_time_hours, None);

        let second = poller.run_once(utc(10)).unwrap();
        assert_eq!(second.delta_in_mb, Some(5.0));
        assert_eq!(second.delta_out_mb, Some(1.0));
        assert_eq!(second.delta_time_hours, Some(1.0));

        let third = poller.run_once(utc(11)).unwrap();
        assert!(third.restart_detected);
        assert_eq!(third.delta_in_mb, None);

        let raw = std::fs::read_to_string(&config.paths.traffic_raw_log).unwrap();
        let raw_lines: Vec<&str> = raw.lines().collect();
        assert_eq!(raw_lines.len(), 4);
        assert_eq!(raw_lines[0], "Time,RAW_ISP_IN,RAW_LAN_OUT,ISP_uptime");
        // UTC config: local time equals UTC.
        assert_eq!(raw_lines[1], "2025-01-15 09:00:00,10485760,2097152,1.0");

        let dif = std::fs::read_to_string(&config.paths.traffic_delta_log).unwrap();
        let dif_lines: Vec<&str> = dif.lines().collect();
        assert_eq!(dif_lines.len(), 4);
        assert_eq!(
            dif_lines[3],
            "2025-01-15 11:00:00,1.0,1.0,0.1,,,1.0,true"
        );

        let state = JsonStore::<PollerState>::new(&config.paths.traffic_state)
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(state.isp_in, Some(MB));
        assert_eq!(state.uptime, Some(0.1));
    }

    #[test]
    fn failed_fetch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let reads = VecDeque::from(vec![Err(PollError::fetch("timeout").into())]);
        let mut poller = TrafficPoller::new(ScriptedRouter { reads }, &config);

        assert!(poller.run_once(utc(9)).is_err());
        assert!(!config.paths.traffic_raw_log.exists());
        assert!(!config.paths.traffic_delta_log.exists());
        assert!(!config.paths.traffic_state.exists());
    }
}
