use anyhow::Result;
use chrono_tz::Tz;

use crate::config::Config;
use crate::csv_log::{CsvLog, STATION_HEADER};
use crate::samples::StationSample;
use crate::tokens::TokenManager;
use crate::vendor::VendorClient;

/// Legacy weather-station poller (indoor base station plus one outdoor module).
pub struct StationPoller {
    tokens: TokenManager,
    client: VendorClient,
    log: CsvLog,
    timezone: Tz,
}

impl StationPoller {
    pub fn new(tokens: TokenManager, client: VendorClient, log: CsvLog, timezone: Tz) -> Self {
        Self {
            tokens,
            client,
            log,
            timezone,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = super::http_client(config)?;
        let (client_id, client_secret) = config.vendor.credentials()?;
        Ok(Self::new(
            TokenManager::new(
                &config.paths.station_tokens,
                http.clone(),
                config.vendor.token_url(),
                client_id,
                client_secret,
            ),
            VendorClient::new(http, config.vendor.api_base.clone()),
            CsvLog::with_header(&config.paths.station_log, STATION_HEADER),
            config.timezone,
        ))
    }

    pub fn run_once(&self) -> Result<StationSample> {
        let access_token = self.tokens.acquire()?;
        let data = self.client.station_data(&access_token)?;
        let sample = data.to_sample(&self.timezone)?;
        self.log.append(&sample)?;
        tracing::info!(
            timestamp = %sample.timestamp,
            temp_indoor = ?sample.temp_indoor,
            temp_outdoor = ?sample.temp_outdoor,
            "station poll recorded"
        );
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::test_http;
    use reqwest::blocking::Client as HttpClient;
    use tempfile::TempDir;

    #[test]
    fn cycle_appends_station_row_with_header_once() {
        let dir = TempDir::new().unwrap();
        let body = r#"{"body": {"devices": [{
            "dashboard_data": {"time_utc": 1736935200, "Temperature": 22.0, "Humidity": 40, "CO2": 700, "Pressure": 1010.5},
            "modules": [{"dashboard_data": {"Temperature": 1.5, "Humidity": 90}}]
        }]}}"#;
        let token = r#"{"access_token":"a","refresh_token":"r"}"#;
        let (base, server) = test_http::serve(vec![
            (200, token.to_string()),
            (200, body.to_string()),
            (200, token.to_string()),
            (200, body.to_string()),
        ]);
        let http = HttpClient::new();
        let poller = StationPoller::new(
            TokenManager::new(
                dir.path().join("tokens.json"),
                http.clone(),
                format!("{base}/oauth2/token"),
                "id",
                "secret",
            ),
            VendorClient::new(http, base.clone()),
            CsvLog::with_header(dir.path().join("station.csv"), STATION_HEADER),
            chrono_tz::UTC,
        );
        poller.tokens.seed("r", None).unwrap();

        poller.run_once().unwrap();
        poller.run_once().unwrap();

        let text = std::fs::read_to_string(dir.path().join("station.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,temp_indoor,humidity_indoor,co2,pressure,temp_outdoor,humidity_outdoor"
        );
        assert_eq!(lines[1], "2025-01-15 10:00:00,22.0,40.0,700.0,1010.5,1.5,90.0");
        assert_eq!(lines[1], lines[2]);
        server.join().unwrap();
    }
}
