use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const RAW_TRAFFIC_HEADER: &[&str] = &["Time", "RAW_ISP_IN", "RAW_LAN_OUT", "ISP_uptime"];
pub const DELTA_TRAFFIC_HEADER: &[&str] = &[
    "Time",
    "ISP_IN_MB",
    "LAN_OUT_MB",
    "ISP_uptime",
    "Delta_ISP_IN_MB",
    "Delta_LAN_OUT_MB",
    "Delta_Time_hr",
    "Restart",
];
pub const CLIMATE_HEADER: &[&str] = &[
    "timestamp",
    "temp_indoor",
    "temp_outdoor",
    "setpoint",
    "boiler",
    "pressure",
];
pub const STATION_HEADER: &[&str] = &[
    "timestamp",
    "temp_indoor",
    "humidity_indoor",
    "co2",
    "pressure",
    "temp_outdoor",
    "humidity_outdoor",
];

/// Append-only CSV file. The header, when there is one, is written exactly once.
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
    header: Option<&'static [&'static str]>,
}

impl CsvLog {
    pub fn with_header(path: impl Into<PathBuf>, header: &'static [&'static str]) -> Self {
        Self {
            path: path.into(),
            header: Some(header),
        }
    }

    pub fn headerless(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            header: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn needs_header(&self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        }
    }

    pub fn append<R: Serialize>(&self, row: &R) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let write_header = self.header.is_some() && self.needs_header();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if write_header {
            if let Some(header) = self.header {
                writer.write_record(header)?;
            }
        }
        writer
            .serialize(row)
            .with_context(|| format!("failed to append row to {}", self.path.display()))?;
        writer.flush()?;
        Ok(())
    }

    /// Typed rows. Headered logs deserialize by column name, headerless ones by position.
    pub fn read<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.header.is_some())
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut rows = Vec::new();
        for (idx, result) in reader.deserialize().enumerate() {
            let row: R = result.with_context(|| {
                format!("malformed row {} in {}", idx + 1, self.path.display())
            })?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Like [`CsvLog::read`], but rows that fail to deserialize are logged and dropped.
    pub fn read_lenient<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.header.is_some())
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for result in reader.deserialize() {
            match result {
                Ok(row) => rows.push(row),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(path = %self.path.display(), skipped, "dropped malformed csv rows");
        }
        Ok(rows)
    }

    /// Raw records for headerless logs whose rows may be partially garbage.
    pub fn read_records(&self) -> Result<Vec<csv::StringRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.header.is_some())
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut records = Vec::new();
        for result in reader.records() {
            match result {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::debug!(path = %self.path.display(), error = %err, "skipping unreadable csv record");
                }
            }
        }
        Ok(records)
    }
}

/// Accepts `true`/`false` in any case, `1`/`0`, and treats anything else as unknown.
pub fn flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_bool))
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" => Some(true),
        "false" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        timestamp: i64,
        #[serde(deserialize_with = "csv::invalid_option")]
        temp_indoor: Option<f64>,
        #[serde(deserialize_with = "csv::invalid_option")]
        temp_outdoor: Option<f64>,
        #[serde(deserialize_with = "csv::invalid_option")]
        setpoint: Option<f64>,
        #[serde(deserialize_with = "flexible_bool")]
        boiler: Option<bool>,
        #[serde(deserialize_with = "csv::invalid_option")]
        pressure: Option<f64>,
    }

    fn row(ts: i64, boiler: Option<bool>) -> Row {
        Row {
            timestamp: ts,
            temp_indoor: Some(21.5),
            temp_outdoor: None,
            setpoint: Some(21.0),
            boiler,
            pressure: Some(1013.2),
        }
    }

    #[test]
    fn appends_keep_order_and_single_header() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::with_header(dir.path().join("climate.csv"), CLIMATE_HEADER);
        for ts in 0..5 {
            log.append(&row(1_700_000_000 + ts, Some(ts % 2 == 0))).unwrap();
        }

        let text = std::fs::read_to_string(log.path()).unwrap();
        let header_lines = text
            .lines()
            .filter(|line| line.starts_with("timestamp,"))
            .count();
        assert_eq!(header_lines, 1);
        assert!(text.starts_with("timestamp,temp_indoor,temp_outdoor,setpoint,boiler,pressure\n"));

        let rows: Vec<Row> = log.read().unwrap();
        assert_eq!(rows.len(), 5);
        let stamps: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, (0..5).map(|ts| 1_700_000_000 + ts).collect::<Vec<_>>());
        assert_eq!(rows[0], row(1_700_000_000, Some(true)));
    }

    #[test]
    fn empty_existing_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("climate.csv");
        std::fs::write(&path, "").unwrap();
        let log = CsvLog::with_header(&path, CLIMATE_HEADER);
        log.append(&row(1, None)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "timestamp,temp_indoor,temp_outdoor,setpoint,boiler,pressure\n1,21.5,,21.0,,1013.2\n");
    }

    #[test]
    fn unknown_values_read_back_as_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("climate.csv");
        std::fs::write(
            &path,
            "timestamp,temp_indoor,temp_outdoor,setpoint,boiler,pressure\n10,abc,3.5,20,True,\n",
        )
        .unwrap();
        let rows: Vec<Row> = CsvLog::with_header(&path, CLIMATE_HEADER).read().unwrap();
        assert_eq!(rows[0].temp_indoor, None);
        assert_eq!(rows[0].temp_outdoor, Some(3.5));
        assert_eq!(rows[0].boiler, Some(true));
        assert_eq!(rows[0].pressure, None);
    }

    #[test]
    fn headerless_log_never_writes_header() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::headerless(dir.path().join("aux.csv"));
        log.append(&("2025-01-01 10:00:00", 12.5)).unwrap();
        log.append(&("2025-01-01 10:05:00", 12.4)).unwrap();
        let records = log.read_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[1][0], "2025-01-01 10:05:00");
    }

    #[test]
    fn bool_parsing_accepts_capitalised_spelling() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(""), None);
        assert_eq!(parse_bool("maybe"), None);
    }
}
