use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::counters::{ByteUnit, COUNTER32_MODULUS};

const DEFAULT_DATA_DIR: &str = "/home/pi/homewatch";
const DEFAULT_TIMEZONE: &str = "Europe/Prague";
const DEFAULT_VENDOR_API_BASE: &str = "https://api.netatmo.com";

pub const OID_WAN_IN: &str = "1.3.6.1.2.1.2.2.1.10.2";
pub const OID_WAN_OUT: &str = "1.3.6.1.2.1.2.2.1.16.2";
pub const OID_SYS_UPTIME: &str = "1.3.6.1.2.1.1.3.0";

#[derive(Debug, Clone)]
pub struct VendorConfig {
    pub api_base: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub home_id: Option<String>,
    pub timeout: Duration,
}

impl VendorConfig {
    pub fn credentials(&self) -> Result<(String, String)> {
        let client_id = self
            .client_id
            .clone()
            .ok_or_else(|| anyhow!("HOMEWATCH_VENDOR_CLIENT_ID is not configured"))?;
        let client_secret = self
            .client_secret
            .clone()
            .ok_or_else(|| anyhow!("HOMEWATCH_VENDOR_CLIENT_SECRET is not configured"))?;
        Ok((client_id, client_secret))
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_base.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct SnmpConfig {
    pub host: String,
    pub port: u16,
    pub community: String,
    pub timeout: Duration,
    pub oid_in: String,
    pub oid_out: String,
    pub oid_uptime: String,
    pub counter_modulus: u64,
    pub byte_unit: ByteUnit,
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub climate_log: PathBuf,
    pub climate_tokens: PathBuf,
    pub station_log: PathBuf,
    pub station_tokens: PathBuf,
    pub traffic_raw_log: PathBuf,
    pub traffic_delta_log: PathBuf,
    pub traffic_state: PathBuf,
    pub aux_room_log: PathBuf,
    pub boiler_log: PathBuf,
}

impl Paths {
    fn under(data_dir: &Path) -> Self {
        Self {
            climate_log: data_dir.join("netatmo_climate.csv"),
            climate_tokens: data_dir.join("netatmo_climate_tokens.json"),
            station_log: data_dir.join("netatmo_data.csv"),
            station_tokens: data_dir.join("netatmo_tokens.json"),
            traffic_raw_log: data_dir.join("traffic_log.csv"),
            traffic_delta_log: data_dir.join("traffic_log_dif.csv"),
            traffic_state: data_dir.join("traffic_state.json"),
            aux_room_log: data_dir.join("teplota_pradelna.csv"),
            boiler_log: data_dir.join("teplota_log.csv"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub bind: String,
    pub tail_rows: usize,
    pub default_hours_back: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub timezone: Tz,
    pub paths: Paths,
    pub vendor: VendorConfig,
    pub snmp: SnmpConfig,
    pub dashboard: DashboardConfig,
}

/// Optional JSON file layered on top of the environment.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigOverrides {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    vendor_api_base: Option<String>,
    #[serde(default)]
    vendor_client_id: Option<String>,
    #[serde(default)]
    vendor_client_secret: Option<String>,
    #[serde(default)]
    vendor_home_id: Option<String>,
    #[serde(default)]
    snmp_host: Option<String>,
    #[serde(default)]
    snmp_port: Option<u16>,
    #[serde(default)]
    snmp_community: Option<String>,
    #[serde(default)]
    snmp_counter_modulus: Option<u64>,
    #[serde(default)]
    snmp_byte_unit: Option<ByteUnit>,
    #[serde(default)]
    climate_log: Option<PathBuf>,
    #[serde(default)]
    station_log: Option<PathBuf>,
    #[serde(default)]
    aux_room_log: Option<PathBuf>,
    #[serde(default)]
    boiler_log: Option<PathBuf>,
    #[serde(default)]
    dashboard_bind: Option<String>,
    #[serde(default)]
    dashboard_tail_rows: Option<usize>,
}

fn config_path(data_dir: &Path) -> PathBuf {
    env_optional("HOMEWATCH_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("config.json"))
}

fn load_overrides(path: &Path) -> Result<ConfigOverrides> {
    if !path.exists() {
        return Ok(ConfigOverrides::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config overrides");
    Ok(parsed)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing .env is the normal case on the Pi.
        let _ = dotenvy::dotenv();

        let data_dir = PathBuf::from(env_string(
            "HOMEWATCH_DATA_DIR",
            Some(DEFAULT_DATA_DIR.to_string()),
        )?);
        let overrides = load_overrides(&config_path(&data_dir))?;
        Self::from_parts(data_dir, overrides)
    }

    fn from_parts(data_dir: PathBuf, overrides: ConfigOverrides) -> Result<Self> {
        let timezone_name = match overrides.timezone {
            Some(name) => name,
            None => env_string("HOMEWATCH_TIMEZONE", Some(DEFAULT_TIMEZONE.to_string()))?,
        };
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|err| anyhow!("invalid time zone {timezone_name}: {err}"))?;

        let mut paths = Paths::under(&data_dir);
        if let Some(path) = env_optional("HOMEWATCH_CLIMATE_LOG").map(PathBuf::from) {
            paths.climate_log = path;
        }
        if let Some(path) = env_optional("HOMEWATCH_AUX_ROOM_LOG").map(PathBuf::from) {
            paths.aux_room_log = path;
        }
        if let Some(path) = env_optional("HOMEWATCH_BOILER_LOG").map(PathBuf::from) {
            paths.boiler_log = path;
        }
        if let Some(path) = overrides.climate_log {
            paths.climate_log = path;
        }
        if let Some(path) = overrides.station_log {
            paths.station_log = path;
        }
        if let Some(path) = overrides.aux_room_log {
            paths.aux_room_log = path;
        }
        if let Some(path) = overrides.boiler_log {
            paths.boiler_log = path;
        }

        let vendor = VendorConfig {
            api_base: overrides.vendor_api_base.unwrap_or(env_string(
                "HOMEWATCH_VENDOR_API_BASE",
                Some(DEFAULT_VENDOR_API_BASE.to_string()),
            )?),
            client_id: overrides
                .vendor_client_id
                .or_else(|| env_optional("HOMEWATCH_VENDOR_CLIENT_ID")),
            client_secret: overrides
                .vendor_client_secret
                .or_else(|| env_optional("HOMEWATCH_VENDOR_CLIENT_SECRET")),
            home_id: overrides
                .vendor_home_id
                .or_else(|| env_optional("HOMEWATCH_VENDOR_HOME_ID")),
            timeout: Duration::from_secs(env_u64("HOMEWATCH_VENDOR_TIMEOUT_SECONDS", Some(15))?),
        };

        let byte_unit = match overrides.snmp_byte_unit {
            Some(unit) => unit,
            None => match env_optional("HOMEWATCH_SNMP_BYTE_UNIT").as_deref() {
                None | Some("binary") => ByteUnit::Binary,
                Some("decimal") => ByteUnit::Decimal,
                Some(other) => return Err(anyhow!("invalid HOMEWATCH_SNMP_BYTE_UNIT {other}")),
            },
        };
        let snmp = SnmpConfig {
            host: overrides.snmp_host.unwrap_or(env_string(
                "HOMEWATCH_SNMP_HOST",
                Some("192.168.11.100".to_string()),
            )?),
            port: match overrides.snmp_port {
                Some(port) => port,
                None => u16::try_from(env_u64("HOMEWATCH_SNMP_PORT", Some(161))?)
                    .context("invalid HOMEWATCH_SNMP_PORT")?,
            },
            community: overrides.snmp_community.unwrap_or(env_string(
                "HOMEWATCH_SNMP_COMMUNITY",
                Some("public".to_string()),
            )?),
            timeout: Duration::from_secs(env_u64("HOMEWATCH_SNMP_TIMEOUT_SECONDS", Some(3))?),
            oid_in: env_string("HOMEWATCH_SNMP_OID_IN", Some(OID_WAN_IN.to_string()))?,
            oid_out: env_string("HOMEWATCH_SNMP_OID_OUT", Some(OID_WAN_OUT.to_string()))?,
            oid_uptime: env_string(
                "HOMEWATCH_SNMP_OID_UPTIME",
                Some(OID_SYS_UPTIME.to_string()),
            )?,
            counter_modulus: match overrides.snmp_counter_modulus {
                Some(modulus) => modulus,
                None => env_u64("HOMEWATCH_SNMP_COUNTER_MODULUS", Some(COUNTER32_MODULUS))?,
            },
            byte_unit,
        };

        let dashboard = DashboardConfig {
            bind: overrides.dashboard_bind.unwrap_or(env_string(
                "HOMEWATCH_DASHBOARD_BIND",
                Some("127.0.0.1:8501".to_string()),
            )?),
            tail_rows: match overrides.dashboard_tail_rows {
                Some(rows) => rows,
                None => env_u64("HOMEWATCH_DASHBOARD_TAIL_ROWS", Some(10))? as usize,
            },
            default_hours_back: env_u64("HOMEWATCH_DASHBOARD_HOURS_BACK", Some(22))? as u32,
        };

        Ok(Self {
            data_dir,
            timezone,
            paths,
            vendor,
            snmp,
            dashboard,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config(data_dir: &Path) -> Config {
    let overrides = ConfigOverrides {
        timezone: Some("UTC".to_string()),
        ..ConfigOverrides::default()
    };
    let mut config = Config::from_parts(data_dir.to_path_buf(), overrides)
        .expect("test config");
    config.paths = Paths::under(data_dir);
    config
}

fn env_string(key: &str, default: Option<String>) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_u64(key: &str, default: Option<u64>) -> Result<u64> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {key}")),
        _ => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let overrides: ConfigOverrides = serde_json::from_str(
            r#"{
                "timezone": "UTC",
                "snmp_host": "10.0.0.1",
                "snmp_counter_modulus": 100,
                "snmp_byte_unit": "decimal",
                "aux_room_log": "/tmp/aux.csv",
                "dashboard_tail_rows": 5
            }"#,
        )
        .unwrap();
        let config = Config::from_parts(PathBuf::from("/data"), overrides).unwrap();
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert_eq!(config.snmp.host, "10.0.0.1");
        assert_eq!(config.snmp.counter_modulus, 100);
        assert_eq!(config.snmp.byte_unit, ByteUnit::Decimal);
        assert_eq!(config.paths.aux_room_log, PathBuf::from("/tmp/aux.csv"));
        assert_eq!(config.paths.traffic_state, PathBuf::from("/data/traffic_state.json"));
        assert_eq!(config.dashboard.tail_rows, 5);
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        let overrides = ConfigOverrides {
            timezone: Some("Mars/Olympus".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(Config::from_parts(PathBuf::from("/data"), overrides).is_err());
    }

    #[test]
    fn token_url_is_derived_from_api_base() {
        let vendor = VendorConfig {
            api_base: "https://api.example.test/".to_string(),
            client_id: None,
            client_secret: None,
            home_id: None,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(vendor.token_url(), "https://api.example.test/oauth2/token");
        assert!(vendor.credentials().is_err());
    }
}
