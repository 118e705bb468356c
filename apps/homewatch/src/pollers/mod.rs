//! One-shot poll cycles. Each variant fetches first and only then touches its files.

pub mod climate;
pub mod station;
pub mod traffic;

use anyhow::Result;
use reqwest::blocking::Client as HttpClient;

use crate::config::Config;

pub fn http_client(config: &Config) -> Result<HttpClient> {
    let client = HttpClient::builder()
        .timeout(config.vendor.timeout)
        .user_agent(concat!("homewatch/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
