pub mod charts;
pub mod equitherm;
pub mod loader;
pub mod page;
pub mod server;
pub mod summary;
pub mod transitions;
pub mod window;

use anyhow::{Context, Result};

use crate::config::Config;
use charts::ChartSpec;
use loader::{ClimateRow, Reading};
use page::{Page, Section};
use summary::{tail_rows, StatusSummary};
use window::{TimeWindow, WindowRequest};

/// Every input the page needs. A failed load is kept as its message so the rest still renders.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub climate: Result<Vec<ClimateRow>, String>,
    pub boiler_output: Result<Vec<Reading>, String>,
    pub aux_room: Result<Vec<Reading>, String>,
}

fn degrade<T>(what: &str, result: Result<Vec<T>>) -> Result<Vec<T>, String> {
    result.map_err(|err| {
        tracing::warn!(input = what, error = %format!("{err:#}"), "dashboard input unavailable");
        format!("{err:#}")
    })
}

impl DashboardData {
    pub fn load(config: &Config) -> Self {
        let tz = &config.timezone;
        Self {
            climate: degrade(
                "climate",
                loader::load_climate(&config.paths.climate_log, tz),
            ),
            boiler_output: degrade(
                "boiler_output",
                loader::load_boiler_output(&config.paths.boiler_log, tz),
            ),
            aux_room: degrade(
                "aux_room",
                loader::load_aux_room(&config.paths.aux_room_log, tz),
            ),
        }
    }
}

fn section(
    title: &'static str,
    spec: Result<ChartSpec, &String>,
    window: &TimeWindow,
) -> Section {
    let rendered = spec
        .map_err(|message| message.clone())
        .and_then(|spec| charts::render_svg(&spec, window).map_err(|err| format!("{err:#}")));
    match rendered {
        Ok(svg) => Section::Chart {
            title: title.to_string(),
            svg,
        },
        Err(message) => {
            tracing::warn!(chart = title, reason = %message, "chart not rendered");
            Section::Warning {
                title: title.to_string(),
                message,
            }
        }
    }
}

/// Builds the full HTML page for one window.
pub fn render_page(config: &Config, data: &DashboardData, request: &WindowRequest) -> Result<String> {
    let window = TimeWindow::resolve(request, &config.timezone).context("invalid window")?;
    let no_climate: &[ClimateRow] = &[];
    let climate = data.climate.as_deref().unwrap_or(no_climate);

    let sections = vec![
        section(
            "Boiler output",
            data.boiler_output
                .as_ref()
                .map(|output| charts::boiler_output_chart(output, climate)),
            &window,
        ),
        section(
            "Indoor",
            data.climate.as_ref().map(|rows| charts::indoor_chart(rows)),
            &window,
        ),
        section(
            "Outdoor",
            data.climate.as_ref().map(|rows| charts::outdoor_chart(rows)),
            &window,
        ),
        section(
            "Pressure",
            data.climate.as_ref().map(|rows| charts::pressure_chart(rows)),
            &window,
        ),
        section(
            "Auxiliary room",
            data.aux_room.as_ref().map(|rows| charts::aux_room_chart(rows)),
            &window,
        ),
    ];

    let notices: Vec<String> = match &data.climate {
        Ok(_) => Vec::new(),
        Err(message) => vec![format!("Climate log unavailable: {message}")],
    };
    let status = StatusSummary::from_rows(climate);
    let tail = tail_rows(climate, config.dashboard.tail_rows);

    Ok(Page {
        request,
        window: &window,
        status: &status,
        tail: &tail,
        sections: &sections,
        notices: &notices,
    }
    .render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn request() -> WindowRequest {
        WindowRequest {
            hours_back: 22,
            end_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            end_hour: 12,
        }
    }

    #[test]
    fn missing_inputs_degrade_to_warnings() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        std::fs::write(
            &config.paths.climate_log,
            "timestamp,temp_indoor,temp_outdoor,setpoint,boiler,pressure\n\
             1736935200,20.5,-5,21,false,1012\n\
             1736935800,20.6,-5,21,true,1012\n",
        )
        .unwrap();

        let data = DashboardData::load(&config);
        assert!(data.climate.is_ok());
        assert!(data.aux_room.is_err());

        let html = render_page(&config, &data, &request()).unwrap();
        assert!(html.contains("<h2>Indoor</h2>\n<div>"));
        assert!(html.contains("<h2>Auxiliary room</h2>\n<p class=\"warning\">"));
        assert!(html.contains("Last boiler start: 15.01.2025 10:10:00"));
        assert!(html.contains("<td>on</td>"));
    }

    #[test]
    fn missing_climate_log_still_renders_page() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let data = DashboardData::load(&config);
        let html = render_page(&config, &data, &request()).unwrap();
        assert!(html.contains("Climate log unavailable"));
        assert!(html.contains("Last sample: N/A"));
    }

    #[test]
    fn bad_end_hour_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let data = DashboardData::load(&config);
        let request = WindowRequest {
            end_hour: 30,
            ..request()
        };
        assert!(render_page(&config, &data, &request).is_err());
    }
}
