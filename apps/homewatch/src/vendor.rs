use anyhow::Result;
use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::blocking::Client as HttpClient;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::PollError;
use crate::samples::{ClimateSample, StationSample};

const THERMOSTAT_MODULE: &str = "NATherm1";
const BASE_STATION_MODULE: &str = "NAMain";
const OUTDOOR_MODULE: &str = "NAModule1";

pub const STATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
pub struct HomeStatus {
    #[serde(default)]
    time_server: Option<i64>,
    body: HomeStatusBody,
}

#[derive(Debug, Deserialize)]
struct HomeStatusBody {
    home: HomeState,
}

#[derive(Debug, Deserialize)]
struct HomeState {
    #[serde(default)]
    rooms: Vec<RoomState>,
    #[serde(default)]
    modules: Vec<ModuleState>,
}

#[derive(Debug, Deserialize)]
struct RoomState {
    #[serde(default)]
    therm_measured_temperature: Option<JsonValue>,
    #[serde(default)]
    therm_setpoint_temperature: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ModuleState {
    #[serde(rename = "type", default)]
    module_type: String,
    #[serde(default)]
    boiler_status: Option<JsonValue>,
    #[serde(default)]
    pressure: Option<JsonValue>,
    #[serde(default)]
    temperature: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct StationData {
    body: StationBody,
}

#[derive(Debug, Deserialize)]
struct StationBody {
    #[serde(default)]
    devices: Vec<StationDevice>,
}

#[derive(Debug, Deserialize)]
struct StationDevice {
    #[serde(default)]
    dashboard_data: Option<JsonValue>,
    #[serde(default)]
    modules: Vec<StationModule>,
}

#[derive(Debug, Deserialize)]
struct StationModule {
    #[serde(default)]
    dashboard_data: Option<JsonValue>,
}

/// Numbers sometimes arrive as strings; anything else is unknown.
fn soft_f64(value: Option<&JsonValue>) -> Option<f64> {
    match value? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn soft_bool(value: Option<&JsonValue>) -> Option<bool> {
    match value? {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => n.as_i64().map(|v| v != 0),
        JsonValue::String(s) => crate::csv_log::parse_bool(s),
        _ => None,
    }
}

impl HomeStatus {
    /// `fallback_ts` is used when the server omits `time_server`.
    pub fn to_sample(&self, fallback_ts: i64) -> ClimateSample {
        let home = &self.body.home;
        let room = home.rooms.first();

        let mut sample = ClimateSample {
            timestamp: self.time_server.unwrap_or(fallback_ts),
            temp_indoor: room.and_then(|r| soft_f64(r.therm_measured_temperature.as_ref())),
            temp_outdoor: None,
            setpoint: room.and_then(|r| soft_f64(r.therm_setpoint_temperature.as_ref())),
            boiler: None,
            pressure: None,
        };
        for module in &home.modules {
            match module.module_type.as_str() {
                THERMOSTAT_MODULE => sample.boiler = soft_bool(module.boiler_status.as_ref()),
                BASE_STATION_MODULE => sample.pressure = soft_f64(module.pressure.as_ref()),
                OUTDOOR_MODULE => sample.temp_outdoor = soft_f64(module.temperature.as_ref()),
                _ => {}
            }
        }
        sample
    }
}

impl StationData {
    pub fn to_sample(&self, tz: &Tz) -> Result<StationSample> {
        let device = self
            .body
            .devices
            .first()
            .ok_or_else(|| PollError::fetch("station response lists no devices"))?;
        let indoor = device.dashboard_data.as_ref();
        let outdoor = device
            .modules
            .first()
            .and_then(|module| module.dashboard_data.as_ref());

        let field = |data: Option<&JsonValue>, key: &str| soft_f64(data.and_then(|d| d.get(key)));

        let time_utc = indoor
            .and_then(|d| d.get("time_utc"))
            .and_then(JsonValue::as_i64)
            .ok_or_else(|| PollError::fetch("station response missing time_utc"))?;
        let local = Utc
            .timestamp_opt(time_utc, 0)
            .single()
            .ok_or_else(|| PollError::fetch(format!("station time_utc out of range: {time_utc}")))?
            .with_timezone(tz);

        Ok(StationSample {
            timestamp: local.format(STATION_TIME_FORMAT).to_string(),
            temp_indoor: field(indoor, "Temperature"),
            humidity_indoor: field(indoor, "Humidity"),
            co2: field(indoor, "CO2"),
            pressure: field(indoor, "Pressure"),
            temp_outdoor: field(outdoor, "Temperature"),
            humidity_outdoor: field(outdoor, "Humidity"),
        })
    }
}

/// Bearer-authenticated reads against the thermostat vendor API.
pub struct VendorClient {
    http: HttpClient,
    api_base: String,
}

impl VendorClient {
    pub fn new(http: HttpClient, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.api_base);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .map_err(|err| PollError::fetch(format!("GET {path} failed: {err}")))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PollError::auth(format!("GET {path} returned {status}")).into());
        }
        if !status.is_success() {
            return Err(PollError::fetch(format!("GET {path} returned {status}")).into());
        }
        let parsed = resp
            .json()
            .map_err(|err| PollError::fetch(format!("GET {path}: unexpected body: {err}")))?;
        Ok(parsed)
    }

    pub fn home_status(&self, access_token: &str, home_id: &str) -> Result<HomeStatus> {
        self.get_json("/api/homestatus", access_token, &[("home_id", home_id)])
    }

    pub fn station_data(&self, access_token: &str) -> Result<StationData> {
        self.get_json("/api/getstationsdata", access_token, &[])
    }
}
