/// Core type definitions shared by the resolver, calendar and range engine
use std::collections::BTreeMap;
use std::fmt;

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TimeError};
use crate::time::calendar::BuiltinCalendars;
use crate::time::range::RangeEngine;
use crate::time::window::{TimeWindow, WindowBounds};
use crate::time::zones::resolve_timezone;

/// A resolved timezone: an IANA zone with its DST history, or a fixed offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Timezone {
    pub fn utc() -> Self {
        Timezone::Named(Tz::UTC)
    }

    pub fn name(&self) -> String {
        match self {
            Timezone::Named(tz) => tz.name().to_string(),
            Timezone::Fixed(offset) => format!("UTC{}", offset),
        }
    }

    /// Convert an absolute instant to wall-clock time in this zone
    pub fn from_utc(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Timezone::Named(tz) => instant.with_timezone(tz).fixed_offset(),
            Timezone::Fixed(offset) => instant.with_timezone(offset),
        }
    }

    /// Attach this zone to a naive wall-clock time.
    ///
    /// Local times skipped or repeated by a DST transition are rejected
    /// instead of being silently resolved to one side.
    pub fn localize(&self, naive: &NaiveDateTime) -> Result<DateTime<FixedOffset>> {
        let local = match self {
            Timezone::Named(tz) => tz.from_local_datetime(naive).map(|dt| dt.fixed_offset()),
            Timezone::Fixed(offset) => offset.from_local_datetime(naive),
        };

        match local {
            LocalResult::Single(dt) => Ok(dt),
            LocalResult::Ambiguous(earliest, latest) => Err(TimeError::AmbiguousLocalTime(format!(
                "{} in {} is either {} or {}",
                naive,
                self.name(),
                earliest,
                latest
            ))),
            LocalResult::None => Err(TimeError::AmbiguousLocalTime(format!(
                "{} does not exist in {}",
                naive,
                self.name()
            ))),
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.from_utc(Utc::now())
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<Tz> for Timezone {
    fn from(tz: Tz) -> Self {
        Timezone::Named(tz)
    }
}

impl From<FixedOffset> for Timezone {
    fn from(offset: FixedOffset) -> Self {
        Timezone::Fixed(offset)
    }
}

/// A point in time as handed to the range engine and the market calendar
#[derive(Debug, Clone, PartialEq)]
pub enum TimePoint {
    /// Time of day without a date
    Time(NaiveTime),
    /// Calendar date without a time
    Date(NaiveDate),
    /// Date and time without a zone
    Naive(NaiveDateTime),
    /// Date and time with a UTC offset
    Zoned(DateTime<FixedOffset>),
    /// Seconds since the Unix epoch
    Epoch(f64),
    /// Unparsed text, e.g. "09:30" or "2025-01-06T10:00:00Z"
    Text(String),
}

impl TimePoint {
    pub fn kind(&self) -> &'static str {
        match self {
            TimePoint::Time(_) => "time",
            TimePoint::Date(_) => "date",
            TimePoint::Naive(_) => "naive datetime",
            TimePoint::Zoned(_) => "datetime",
            TimePoint::Epoch(_) => "epoch seconds",
            TimePoint::Text(_) => "str",
        }
    }
}

pub(crate) fn epoch_to_utc(seconds: f64) -> Result<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(TimeError::type_mismatch("point", "finite epoch seconds", "non-finite float"));
    }

    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;

    DateTime::from_timestamp(whole as i64, nanos).ok_or_else(|| {
        TimeError::type_mismatch("point", "epoch seconds within the supported range", "out-of-range float")
    })
}

impl From<NaiveTime> for TimePoint {
    fn from(time: NaiveTime) -> Self {
        TimePoint::Time(time)
    }
}

impl From<NaiveDate> for TimePoint {
    fn from(date: NaiveDate) -> Self {
        TimePoint::Date(date)
    }
}

impl From<NaiveDateTime> for TimePoint {
    fn from(datetime: NaiveDateTime) -> Self {
        TimePoint::Naive(datetime)
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimePoint {
    fn from(datetime: DateTime<T>) -> Self {
        TimePoint::Zoned(datetime.fixed_offset())
    }
}

impl From<f64> for TimePoint {
    fn from(seconds: f64) -> Self {
        TimePoint::Epoch(seconds)
    }
}

impl From<i64> for TimePoint {
    fn from(seconds: i64) -> Self {
        TimePoint::Epoch(seconds as f64)
    }
}

impl From<&str> for TimePoint {
    fn from(text: &str) -> Self {
        TimePoint::Text(text.to_string())
    }
}

impl From<String> for TimePoint {
    fn from(text: String) -> Self {
        TimePoint::Text(text)
    }
}

/// How `time_in_range` treats a pair whose `to` is earlier than `from`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// Inside when `to <= point <= from`, the historical behaviour
    #[default]
    Literal,
    /// Inside when `point >= from` or `point <= to` (overnight session)
    Overnight,
}

impl WrapMode {
    pub fn as_str(&self) -> &str {
        match self {
            WrapMode::Literal => "literal",
            WrapMode::Overnight => "overnight",
        }
    }
}

/// Per-market calendar overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MarketOverrides {
    pub extra_holidays: Vec<NaiveDate>,
}

/// Library configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Logging
    pub log_level: String,

    // Timezones
    pub default_timezone: String,
    pub epoch_timezone: String,

    // Range Engine
    pub wrap_mode: WrapMode,
    pub window: Option<WindowBounds>,

    // Market Calendars
    pub markets: BTreeMap<String, MarketOverrides>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_level: "info".to_string(),
            default_timezone: "UTC".to_string(),
            epoch_timezone: "UTC".to_string(),
            wrap_mode: WrapMode::default(),
            window: None,
            markets: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn default_timezone(&self) -> Result<Timezone> {
        resolve_timezone(&self.default_timezone)
    }

    pub fn epoch_timezone(&self) -> Result<Timezone> {
        resolve_timezone(&self.epoch_timezone)
    }

    pub fn range_engine(&self) -> Result<RangeEngine> {
        Ok(RangeEngine::new(self.wrap_mode, self.epoch_timezone()?))
    }

    pub fn calendars(&self) -> BuiltinCalendars {
        BuiltinCalendars::with_overrides(&self.markets)
    }

    /// The configured default window, or a full-day window when none is set
    pub fn window(&self) -> Result<TimeWindow> {
        let epoch_zone = self.epoch_timezone()?;
        let window = match &self.window {
            Some(bounds) => {
                let wrap_mode = bounds.wrap_mode.unwrap_or(self.wrap_mode);
                TimeWindow::try_from(bounds.clone())?.with_wrap_mode(wrap_mode)
            }
            None => TimeWindow::default().with_wrap_mode(self.wrap_mode),
        };
        Ok(window.with_epoch_zone(epoch_zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_offset_name() {
        let tz = Timezone::Fixed(FixedOffset::west_opt(4 * 3600).unwrap());
        assert_eq!(tz.name(), "UTC-04:00");
        assert_eq!(Timezone::utc().to_string(), "UTC");
    }

    #[test]
    fn test_localize_rejects_gap_and_overlap() {
        let tz = Timezone::Named(chrono_tz::America::New_York);

        // 2024-03-10 02:30 never happens in New York
        let gap = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(2, 30, 0).unwrap();
        assert!(matches!(tz.localize(&gap), Err(TimeError::AmbiguousLocalTime(_))));

        // 2024-11-03 01:30 happens twice
        let overlap = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap().and_hms_opt(1, 30, 0).unwrap();
        assert!(matches!(tz.localize(&overlap), Err(TimeError::AmbiguousLocalTime(_))));

        let normal = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let localized = tz.localize(&normal).unwrap();
        assert_eq!(localized.offset().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_time_point_conversions() {
        let utc = Utc.with_ymd_and_hms(2025, 1, 6, 15, 0, 0).unwrap();
        match TimePoint::from(utc) {
            TimePoint::Zoned(dt) => assert_eq!(dt.offset().local_minus_utc(), 0),
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(TimePoint::from("09:30"), TimePoint::Text("09:30".to_string()));
        assert_eq!(TimePoint::from(60_i64), TimePoint::Epoch(60.0));
        assert_eq!(TimePoint::from(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()).kind(), "date");
    }

    #[test]
    fn test_epoch_to_utc() {
        let instant = epoch_to_utc(1_704_726_000.5).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 8, 15, 0, 0).unwrap() + chrono::Duration::milliseconds(500));
        assert!(epoch_to_utc(f64::NAN).is_err());
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.wrap_mode, WrapMode::Literal);
        assert_eq!(settings.default_timezone().unwrap(), Timezone::utc());

        let window = settings.window().unwrap();
        assert_eq!(window.to_string(), "00:00:00 - 23:59:59");
    }
}
