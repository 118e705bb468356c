use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::SnmpConfig;
use crate::error::PollError;

/// Raw router counters as read, before any unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterCounters {
    pub raw_in: Option<u64>,
    pub raw_out: Option<u64>,
    pub uptime_ticks: Option<u64>,
}

pub trait CounterSource {
    fn read_counters(&mut self) -> Result<RouterCounters>;
}

pub struct SnmpRouter {
    host: String,
    port: u16,
    community: String,
    timeout: Duration,
    oid_in: Vec<u32>,
    oid_out: Vec<u32>,
    oid_uptime: Vec<u32>,
}

impl SnmpRouter {
    pub fn from_config(config: &SnmpConfig) -> Result<Self> {
        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            community: config.community.clone(),
            timeout: config.timeout,
            oid_in: parse_snmp_oid(&config.oid_in)?,
            oid_out: parse_snmp_oid(&config.oid_out)?,
            oid_uptime: parse_snmp_oid(&config.oid_uptime)?,
        })
    }
}

impl CounterSource for SnmpRouter {
    fn read_counters(&mut self) -> Result<RouterCounters> {
        let mut session = snmp::SyncSession::new(
            (self.host.as_str(), self.port),
            self.community.as_bytes(),
            Some(self.timeout),
            0,
        )
        .map_err(|err| PollError::fetch(format!("snmp session init failed: {err}")))?;

        let mut get = |oid: &[u32]| -> Result<Option<u64>> {
            let mut response = session.get(oid).map_err(|err| {
                PollError::fetch(format!("snmp get {} failed: {err:?}", format_oid(oid)))
            })?;
            Ok(response
                .varbinds
                .next()
                .and_then(|(_name, value)| snmp_value_to_u64(&value)))
        };

        let raw_in = get(&self.oid_in)?;
        let raw_out = get(&self.oid_out)?;
        let uptime_ticks = get(&self.oid_uptime)?;
        tracing::debug!(host = %self.host, ?raw_in, ?raw_out, ?uptime_ticks, "snmp counters read");
        Ok(RouterCounters {
            raw_in,
            raw_out,
            uptime_ticks,
        })
    }
}

fn snmp_value_to_u64(value: &snmp::Value<'_>) -> Option<u64> {
    match value {
        snmp::Value::Counter32(v) => Some(u64::from(*v)),
        snmp::Value::Unsigned32(v) => Some(u64::from(*v)),
        snmp::Value::Timeticks(v) => Some(u64::from(*v)),
        snmp::Value::Counter64(v) => Some(*v),
        snmp::Value::Integer(v) => u64::try_from(*v).ok(),
        snmp::Value::OctetString(bytes) => {
            crate::counters::parse_counter(&String::from_utf8_lossy(bytes))
        }
        _ => None,
    }
}

fn format_oid(oid: &[u32]) -> String {
    oid.iter()
        .map(|part| part.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

pub fn parse_snmp_oid(oid: &str) -> Result<Vec<u32>> {
    let trimmed = oid.trim().trim_start_matches('.');
    let mut parts = Vec::new();
    for part in trimmed.split('.') {
        if part.is_empty() {
            continue;
        }
        parts.push(
            part.parse::<u32>()
                .with_context(|| format!("invalid OID segment {part}"))?,
        );
    }
    if parts.is_empty() {
        Err(anyhow::anyhow!("empty OID"))
    } else {
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_oids() {
        assert_eq!(
            parse_snmp_oid(".1.3.6.1.2.1.1.3.0").unwrap(),
            vec![1, 3, 6, 1, 2, 1, 1, 3, 0]
        );
        assert!(parse_snmp_oid("1.3.x").is_err());
        assert!(parse_snmp_oid(" . ").is_err());
    }

    #[test]
    fn counter_values_convert_and_others_are_unknown() {
        assert_eq!(snmp_value_to_u64(&snmp::Value::Counter32(7)), Some(7));
        assert_eq!(snmp_value_to_u64(&snmp::Value::Timeticks(360_000)), Some(360_000));
        assert_eq!(snmp_value_to_u64(&snmp::Value::Counter64(1 << 40)), Some(1 << 40));
        assert_eq!(snmp_value_to_u64(&snmp::Value::Integer(-1)), None);
        assert_eq!(snmp_value_to_u64(&snmp::Value::OctetString(b"123")), Some(123));
        assert_eq!(snmp_value_to_u64(&snmp::Value::Null), None);
    }

    #[test]
    fn formats_oid_for_messages() {
        assert_eq!(format_oid(&[1, 3, 6, 1]), "1.3.6.1");
    }
}
