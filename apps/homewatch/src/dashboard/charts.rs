use anyhow::{anyhow, bail, Result};
use chrono::{TimeZone, Utc};
use plotters::prelude::*;

use super::loader::{ClimateRow, Reading};
use super::window::TimeWindow;

const WIDTH: u32 = 900;
const HEIGHT: u32 = 320;
const BOILER_TRACE_BASE: f64 = 20.5;
const ORANGE: RGBColor = RGBColor(230, 126, 34);
const GREY: RGBColor = RGBColor(120, 120, 120);

/// One named line; `None` values split the line into separate segments.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: &'static str,
    pub color: RGBColor,
    pub points: Vec<(i64, Option<f64>)>,
}

impl Series {
    fn from_climate(
        label: &'static str,
        color: RGBColor,
        rows: &[ClimateRow],
        value: impl Fn(&ClimateRow) -> Option<f64>,
    ) -> Self {
        Self {
            label,
            color,
            points: rows
                .iter()
                .map(|row| (row.sample.timestamp, value(row)))
                .collect(),
        }
    }

    fn from_readings(label: &'static str, color: RGBColor, readings: &[Reading]) -> Self {
        Self {
            label,
            color,
            points: readings
                .iter()
                .map(|reading| (reading.time.timestamp(), Some(reading.value)))
                .collect(),
        }
    }

    /// Contiguous runs of known values inside the window.
    fn segments(&self, window: &TimeWindow) -> Vec<Vec<(i64, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for &(ts, value) in &self.points {
            if !window.contains_ts(ts) {
                continue;
            }
            match value {
                Some(v) if v.is_finite() => current.push((ts, v)),
                _ => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: &'static str,
    pub y_desc: &'static str,
    pub series: Vec<Series>,
}

pub fn boiler_output_chart(output: &[Reading], climate: &[ClimateRow]) -> ChartSpec {
    ChartSpec {
        title: "Boiler output vs equithermal target",
        y_desc: "°C",
        series: vec![
            Series::from_readings("Boiler output", RED, output),
            Series::from_climate("Equithermal target", BLUE, climate, |row| row.target),
        ],
    }
}

pub fn indoor_chart(climate: &[ClimateRow]) -> ChartSpec {
    ChartSpec {
        title: "Indoor temperature",
        y_desc: "°C",
        series: vec![
            Series::from_climate("Indoor", RED, climate, |row| row.sample.temp_indoor),
            Series::from_climate("Setpoint", BLUE, climate, |row| row.sample.setpoint),
            Series::from_climate("Boiler on", ORANGE, climate, |row| {
                row.sample
                    .boiler
                    .map(|on| BOILER_TRACE_BASE + if on { 1.0 } else { 0.0 })
            }),
        ],
    }
}

pub fn outdoor_chart(climate: &[ClimateRow]) -> ChartSpec {
    ChartSpec {
        title: "Outdoor temperature vs equithermal target",
        y_desc: "°C",
        series: vec![
            Series::from_climate("Outdoor", GREEN, climate, |row| row.sample.temp_outdoor),
            Series::from_climate("Equithermal target", BLUE, climate, |row| row.target),
        ],
    }
}

pub fn pressure_chart(climate: &[ClimateRow]) -> ChartSpec {
    ChartSpec {
        title: "Barometric pressure",
        y_desc: "hPa",
        series: vec![Series::from_climate("Pressure", GREY, climate, |row| {
            row.sample.pressure
        })],
    }
}

pub fn aux_room_chart(readings: &[Reading]) -> ChartSpec {
    ChartSpec {
        title: "Auxiliary room temperature",
        y_desc: "°C",
        series: vec![Series::from_readings("Aux room", MAGENTA, readings)],
    }
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    let pad = if max > min { (max - min) * 0.1 } else { 1.0 };
    Some((min - pad, max + pad))
}

/// Renders `spec` over the window as an SVG document. Fails when no series has data in range.
pub fn render_svg(spec: &ChartSpec, window: &TimeWindow) -> Result<String> {
    let segmented: Vec<(&Series, Vec<Vec<(i64, f64)>>)> = spec
        .series
        .iter()
        .map(|series| (series, series.segments(window)))
        .collect();
    let Some((y_min, y_max)) = y_range(
        segmented
            .iter()
            .flat_map(|(_, segments)| segments.iter().flatten().map(|&(_, v)| v)),
    ) else {
        bail!("no data in the selected window");
    };

    let tz = window.start.timezone();
    let x_format = if window.end_ts() - window.start_ts() > 24 * 3600 {
        "%d.%m %H:%M"
    } else {
        "%H:%M"
    };
    let x_label = |ts: &i64| {
        Utc.timestamp_opt(*ts, 0)
            .single()
            .map(|dt| dt.with_timezone(&tz).format(x_format).to_string())
            .unwrap_or_default()
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| anyhow!("{e:?}"))?;
        let mut chart = ChartBuilder::on(&root)
            .caption(spec.title, ("sans-serif", 20))
            .margin(12)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(window.start_ts()..window.end_ts(), y_min..y_max)
            .map_err(|e| anyhow!("{e:?}"))?;
        chart
            .configure_mesh()
            .x_labels(8)
            .x_label_formatter(&x_label)
            .y_desc(spec.y_desc)
            .draw()
            .map_err(|e| anyhow!("{e:?}"))?;

        for (series, segments) in &segmented {
            let color = series.color;
            chart
                .draw_series(
                    segments
                        .iter()
                        .map(|segment| PathElement::new(segment.clone(), color.stroke_width(2))),
                )
                .map_err(|e| anyhow!("{e:?}"))?
                .label(series.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(|e| anyhow!("{e:?}"))?;
        root.present().map_err(|e| anyhow!("{e:?}"))?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::equitherm::supply_target;
    use crate::dashboard::window::WindowRequest;
    use crate::samples::ClimateSample;
    use chrono::NaiveDate;

    fn window() -> TimeWindow {
        let request = WindowRequest {
            hours_back: 2,
            end_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            end_hour: 12,
        };
        TimeWindow::resolve(&request, &chrono_tz::UTC).unwrap()
    }

    fn row(timestamp: i64, outdoor: Option<f64>, boiler: Option<bool>) -> ClimateRow {
        ClimateRow {
            sample: ClimateSample {
                timestamp,
                temp_indoor: Some(21.0),
                temp_outdoor: outdoor,
                setpoint: Some(21.5),
                boiler,
                pressure: Some(1010.0),
            },
            local: Utc
                .timestamp_opt(timestamp, 0)
                .unwrap()
                .with_timezone(&chrono_tz::UTC),
            target: outdoor.map(supply_target),
        }
    }

    // 2025-01-15 10:00 UTC
    const T0: i64 = 1736935200;

    #[test]
    fn unknown_values_split_segments_and_window_filters() {
        let rows = vec![
            row(T0 - 600, Some(1.0), None),
            row(T0, Some(1.0), Some(true)),
            row(T0 + 600, Some(2.0), Some(false)),
            row(T0 + 1200, None, None),
            row(T0 + 1800, Some(3.0), Some(true)),
        ];
        let spec = outdoor_chart(&rows);
        let segments = spec.series[0].segments(&window());
        assert_eq!(
            segments,
            vec![vec![(T0, 1.0), (T0 + 600, 2.0)], vec![(T0 + 1800, 3.0)]]
        );

        let boiler = &indoor_chart(&rows).series[2];
        assert_eq!(boiler.points[1], (T0, Some(21.5)));
        assert_eq!(boiler.points[2], (T0 + 600, Some(20.5)));
    }

    #[test]
    fn renders_svg_with_title_and_legend() {
        let rows = vec![row(T0, Some(-5.0), Some(false)), row(T0 + 600, Some(-4.0), Some(true))];
        let svg = render_svg(&indoor_chart(&rows), &window()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Indoor temperature"));
        assert!(svg.contains("Setpoint"));
    }

    #[test]
    fn empty_window_is_an_error() {
        let rows = vec![row(T0 - 7200 * 3, Some(1.0), None)];
        assert!(render_svg(&pressure_chart(&rows), &window()).is_err());
        assert!(render_svg(&aux_room_chart(&[]), &window()).is_err());
    }

    #[test]
    fn flat_series_gets_padded_range() {
        assert_eq!(y_range([5.0, 5.0].into_iter()), Some((4.0, 6.0)));
        assert_eq!(y_range(std::iter::empty()), None);
    }
}
