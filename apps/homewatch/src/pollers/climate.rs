use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::csv_log::{CsvLog, CLIMATE_HEADER};
use crate::samples::ClimateSample;
use crate::tokens::TokenManager;
use crate::vendor::VendorClient;

pub struct ClimatePoller {
    tokens: TokenManager,
    client: VendorClient,
    home_id: String,
    log: CsvLog,
}

impl ClimatePoller {
    pub fn new(tokens: TokenManager, client: VendorClient, home_id: String, log: CsvLog) -> Self {
        Self {
            tokens,
            client,
            home_id,
            log,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = super::http_client(config)?;
        let (client_id, client_secret) = config.vendor.credentials()?;
        let home_id = config
            .vendor
            .home_id
            .clone()
            .ok_or_else(|| anyhow!("HOMEWATCH_VENDOR_HOME_ID is not configured"))?;
        Ok(Self::new(
            TokenManager::new(
                &config.paths.climate_tokens,
                http.clone(),
                config.vendor.token_url(),
                client_id,
                client_secret,
            ),
            VendorClient::new(http, config.vendor.api_base.clone()),
            home_id,
            CsvLog::with_header(&config.paths.climate_log, CLIMATE_HEADER),
        ))
    }

    pub fn run_once(&self, now: DateTime<Utc>) -> Result<ClimateSample> {
        let access_token = self.tokens.acquire()?;
        let status = self.client.home_status(&access_token, &self.home_id)?;
        let sample = status.to_sample(now.timestamp());
        self.log.append(&sample)?;
        tracing::info!(
            timestamp = sample.timestamp,
            temp_indoor = ?sample.temp_indoor,
            temp_outdoor = ?sample.temp_outdoor,
            boiler = ?sample.boiler,
            "climate poll recorded"
        );
        Ok(sample)
    }
}
