use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::window::{TimeWindow, WindowRequest};
use super::{render_page, DashboardData};
use crate::config::Config;

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub hours_back: Option<u32>,
    pub end_date: Option<NaiveDate>,
    pub end_hour: Option<u32>,
}

impl WindowQuery {
    /// Missing fields fall back to the configured depth ending at the current local hour.
    pub fn into_request(self, config: &Config) -> WindowRequest {
        let now = WindowRequest::ending_now(
            self.hours_back.unwrap_or(config.dashboard.default_hours_back),
            Utc::now(),
            &config.timezone,
        );
        WindowRequest {
            end_date: self.end_date.unwrap_or(now.end_date),
            end_hour: self.end_hour.unwrap_or(now.end_hour),
            ..now
        }
    }
}

pub fn router(config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .with_state(config)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(
    State(config): State<Arc<Config>>,
    Query(query): Query<WindowQuery>,
) -> Result<Html<String>, (StatusCode, String)> {
    let request = query.into_request(&config);
    TimeWindow::resolve(&request, &config.timezone)
        .map_err(|err| (StatusCode::BAD_REQUEST, format!("{err:#}")))?;

    let page = tokio::task::spawn_blocking(move || {
        let data = DashboardData::load(&config);
        render_page(&config, &data, &request)
    })
    .await
    .map_err(|err| internal_error(&err))?
    .map_err(|err| internal_error(&err))?;
    Ok(Html(page))
}

fn internal_error(err: &dyn std::fmt::Display) -> (StatusCode, String) {
    tracing::error!(error = %err, "dashboard render failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down dashboard");
}

pub async fn serve(config: Arc<Config>, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind dashboard listener on {bind}"))?;
    tracing::info!(addr = %bind, "dashboard listening");
    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("dashboard server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use tempfile::TempDir;

    #[tokio::test]
    async fn index_renders_page_for_explicit_window() {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(test_config(dir.path()));
        let query = WindowQuery {
            hours_back: Some(6),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 15),
            end_hour: Some(12),
        };
        let Html(page) = index(State(config), Query(query)).await.unwrap();
        assert!(page.contains("Period: 15.01.2025 06:00 – 15.01.2025 12:00"));
    }

    #[tokio::test]
    async fn out_of_range_hour_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(test_config(dir.path()));
        let query = WindowQuery {
            end_hour: Some(24),
            ..WindowQuery::default()
        };
        let (status, _) = index(State(config), Query(query)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn query_defaults_to_configured_depth() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let request = WindowQuery::default().into_request(&config);
        assert_eq!(request.hours_back, config.dashboard.default_hours_back);
        assert!(request.end_hour < 24);
    }
}
