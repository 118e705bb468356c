use anyhow::{anyhow, bail, Result};
use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

pub const MIN_HOURS_BACK: u32 = 1;
pub const MAX_HOURS_BACK: u32 = 48;

/// What the user picked: how far back from which local date and hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRequest {
    pub hours_back: u32,
    pub end_date: NaiveDate,
    pub end_hour: u32,
}

impl WindowRequest {
    /// The current local hour, `hours_back` deep.
    pub fn ending_now(hours_back: u32, now: DateTime<Utc>, tz: &Tz) -> Self {
        let local = now.with_timezone(tz).naive_local();
        Self {
            hours_back,
            end_date: local.date(),
            end_hour: local.hour(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl TimeWindow {
    pub fn resolve(request: &WindowRequest, tz: &Tz) -> Result<Self> {
        if request.end_hour > 23 {
            bail!("end hour must be 0-23, got {}", request.end_hour);
        }
        let hours_back = request.hours_back.clamp(MIN_HOURS_BACK, MAX_HOURS_BACK);
        let time = NaiveTime::from_hms_opt(request.end_hour, 0, 0)
            .ok_or_else(|| anyhow!("invalid end hour {}", request.end_hour))?;
        let end = resolve_local(tz, request.end_date.and_time(time))?;
        let start = end - Duration::hours(i64::from(hours_back));
        Ok(Self { start, end })
    }

    pub fn start_ts(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_ts(&self) -> i64 {
        self.end.timestamp()
    }

    pub fn contains_ts(&self, ts: i64) -> bool {
        ts >= self.start_ts() && ts <= self.end_ts()
    }

    pub fn label(&self) -> String {
        format!(
            "{} – {}",
            self.start.format("%d.%m.%Y %H:%M"),
            self.end.format("%d.%m.%Y %H:%M")
        )
    }
}

/// Local wall-clock time to an instant. Ambiguous times take the earlier instant, times inside
/// a DST gap move forward to the first valid minute.
pub fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>> {
    const SEARCH_MINUTES: i64 = 180;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(a, b) => Ok(if a <= b { a } else { b }),
        LocalResult::None => {
            for offset in 1..=SEARCH_MINUTES {
                let candidate = naive + Duration::minutes(offset);
                if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
                    return Ok(dt);
                }
            }
            Err(anyhow!("no valid local datetime found after {naive}"))
        }
    }
}
