/// Named time-of-day windows, e.g. an entry window or a trading session
use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TimeError};
use crate::time::parse::parse_time;
use crate::time::range::RangeEngine;
use crate::types::{TimePoint, Timezone, WrapMode};

const DISPLAY_FORMAT: &str = "%H:%M:%S";
const SERIALIZED_FORMAT: &str = "%H:%M:%S%.f";

fn default_start() -> NaiveTime {
    NaiveTime::default()
}

fn default_end() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}

/// Serialized form of a window; absent bounds take the defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_mode: Option<WrapMode>,
}

/// A start/end pair of times of day with membership tests.
///
/// Bounds default to 00:00:00 and 23:59:59. Epoch points are read in the
/// window's epoch zone (UTC unless set). Not synchronized: wrap it in a
/// lock if `adjust` can run while other threads call `contains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds", into = "WindowBounds")]
pub struct TimeWindow {
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
    wrap_mode: WrapMode,
    epoch_zone: Timezone,
}

impl TimeWindow {
    pub fn new(start: Option<TimePoint>, end: Option<TimePoint>) -> Result<Self> {
        let start = start.map(|bound| window_bound("start", bound)).transpose()?;
        let end = end.map(|bound| window_bound("end", bound)).transpose()?;

        Ok(TimeWindow {
            start: Some(start.unwrap_or_else(default_start)),
            end: Some(end.unwrap_or_else(default_end)),
            wrap_mode: WrapMode::default(),
            epoch_zone: Timezone::utc(),
        })
    }

    pub fn with_wrap_mode(mut self, wrap_mode: WrapMode) -> Self {
        self.wrap_mode = wrap_mode;
        self
    }

    pub fn with_epoch_zone(mut self, epoch_zone: Timezone) -> Self {
        self.epoch_zone = epoch_zone;
        self
    }

    pub fn start(&self) -> Option<NaiveTime> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveTime> {
        self.end
    }

    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    pub fn epoch_zone(&self) -> Timezone {
        self.epoch_zone
    }

    /// Replace the given bounds; a bound passed as `None` keeps its value.
    ///
    /// Both inputs are validated before either bound changes.
    pub fn adjust(&mut self, start: Option<TimePoint>, end: Option<TimePoint>) -> Result<()> {
        let start = start.map(|bound| window_bound("start", bound)).transpose()?;
        let end = end.map(|bound| window_bound("end", bound)).transpose()?;

        if let Some(start) = start {
            self.start = Some(start);
        }
        if let Some(end) = end {
            self.end = Some(end);
        }

        Ok(())
    }

    /// Check whether the time of day of `point` falls inside the window
    pub fn contains(&self, point: impl Into<TimePoint>) -> Result<bool> {
        if self.start.is_none() && self.end.is_none() {
            return Err(TimeError::InvalidWindow(
                "Both start and end can't be None.".to_string(),
            ));
        }

        RangeEngine::new(self.wrap_mode, self.epoch_zone).time_in_range(
            point,
            self.start.map(TimePoint::Time),
            self.end.map(TimePoint::Time),
        )
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow {
            start: Some(default_start()),
            end: Some(default_end()),
            wrap_mode: WrapMode::default(),
            epoch_zone: Timezone::utc(),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |bound: Option<NaiveTime>| match bound {
            Some(time) => time.format(DISPLAY_FORMAT).to_string(),
            None => "--:--:--".to_string(),
        };
        write!(f, "{} - {}", show(self.start), show(self.end))
    }
}

impl TryFrom<WindowBounds> for TimeWindow {
    type Error = TimeError;

    fn try_from(bounds: WindowBounds) -> Result<Self> {
        let window = TimeWindow::new(
            bounds.start.map(TimePoint::Text),
            bounds.end.map(TimePoint::Text),
        )?;
        Ok(window.with_wrap_mode(bounds.wrap_mode.unwrap_or_default()))
    }
}

impl From<TimeWindow> for WindowBounds {
    fn from(window: TimeWindow) -> Self {
        WindowBounds {
            start: window.start.map(|time| time.format(SERIALIZED_FORMAT).to_string()),
            end: window.end.map(|time| time.format(SERIALIZED_FORMAT).to_string()),
            wrap_mode: Some(window.wrap_mode),
        }
    }
}

fn window_bound(argument: &str, bound: TimePoint) -> Result<NaiveTime> {
    match bound {
        TimePoint::Time(time) => Ok(time),
        TimePoint::Naive(datetime) => Ok(datetime.time()),
        TimePoint::Zoned(datetime) => Ok(datetime.time()),
        TimePoint::Text(text) => parse_time(&text),
        other => Err(TimeError::type_mismatch(argument, "datetime, time or str", other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_default_window() {
        let window = TimeWindow::new(None, None).unwrap();
        assert_eq!(window.start(), Some(hms(0, 0, 0)));
        assert_eq!(window.end(), Some(hms(23, 59, 59)));
        assert!(window.contains(hms(12, 0, 0)).unwrap());
        assert_eq!(window, TimeWindow::default());
    }

    #[test]
    fn test_partial_construction() {
        let window = TimeWindow::new(None, Some("16:00".into())).unwrap();
        assert_eq!(window.start(), Some(hms(0, 0, 0)));
        assert_eq!(window.end(), Some(hms(16, 0, 0)));
    }

    #[test]
    fn test_adjust_keeps_untouched_bound() {
        let mut window = TimeWindow::new(None, Some("16:00".into())).unwrap();
        window.adjust(Some("09:30".into()), None).unwrap();
        assert_eq!(window.start(), Some(hms(9, 30, 0)));
        assert_eq!(window.end(), Some(hms(16, 0, 0)));

        window.adjust(None, Some(hms(15, 30, 0).into())).unwrap();
        assert_eq!(window.start(), Some(hms(9, 30, 0)));
        assert_eq!(window.end(), Some(hms(15, 30, 0)));
    }

    #[test]
    fn test_adjust_is_all_or_nothing() {
        let mut window = TimeWindow::new(Some("09:30".into()), Some("16:00".into())).unwrap();
        let err = window.adjust(Some("10:00".into()), Some("late".into())).unwrap_err();
        assert!(matches!(err, TimeError::UnparsableTime(_)));
        assert_eq!(window.start(), Some(hms(9, 30, 0)));
    }

    #[test]
    fn test_bounds_from_datetimes() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap().and_hms_opt(9, 15, 0).unwrap();
        let end = chrono_tz::Asia::Kolkata.with_ymd_and_hms(2025, 1, 6, 15, 30, 0).unwrap();
        let window = TimeWindow::new(Some(start.into()), Some(end.into())).unwrap();
        assert_eq!(window.to_string(), "09:15:00 - 15:30:00");
    }

    #[test]
    fn test_rejects_unsupported_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert!(matches!(
            TimeWindow::new(Some(date.into()), None),
            Err(TimeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            TimeWindow::new(None, Some(TimePoint::Epoch(0.0))),
            Err(TimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_contains() {
        let window = TimeWindow::new(Some("09:30".into()), Some("16:00".into())).unwrap();
        assert!(window.contains("09:30").unwrap());
        assert!(window.contains("16:00").unwrap());
        assert!(!window.contains("16:00:01").unwrap());

        let open = chrono_tz::America::New_York.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        assert!(window.contains(open).unwrap());
    }

    #[test]
    fn test_contains_wrapped_window() {
        let literal = TimeWindow::new(Some("22:00".into()), Some("02:00".into())).unwrap();
        assert!(!literal.contains("23:00").unwrap());
        assert!(literal.contains("12:00").unwrap());

        let overnight = literal.clone().with_wrap_mode(WrapMode::Overnight);
        assert!(overnight.contains("23:00").unwrap());
        assert!(overnight.contains("01:00").unwrap());
        assert!(!overnight.contains("12:00").unwrap());
    }

    #[test]
    fn test_contains_without_bounds() {
        let window = TimeWindow {
            start: None,
            end: None,
            wrap_mode: WrapMode::Literal,
            epoch_zone: Timezone::utc(),
        };
        assert!(matches!(
            window.contains("12:00"),
            Err(TimeError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_serde() {
        let window: TimeWindow = serde_json::from_str(r#"{"start": "09:30"}"#).unwrap();
        assert_eq!(window.start(), Some(hms(9, 30, 0)));
        assert_eq!(window.end(), Some(hms(23, 59, 59)));

        let json = serde_json::to_string(&window).unwrap();
        assert_eq!(json, r#"{"start":"09:30:00","end":"23:59:59","wrap_mode":"literal"}"#);

        let bad = serde_json::from_str::<TimeWindow>(r#"{"end": "teatime"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_serde_keeps_fractional_seconds() {
        let start = NaiveTime::from_hms_milli_opt(9, 30, 0, 250).unwrap();
        let window = TimeWindow::new(Some(start.into()), None).unwrap();

        let json = serde_json::to_string(&window).unwrap();
        assert_eq!(json, r#"{"start":"09:30:00.250","end":"23:59:59","wrap_mode":"literal"}"#);

        let back: TimeWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(back.start(), Some(start));
    }

    #[test]
    fn test_contains_epoch_in_window_zone() {
        let window = TimeWindow::new(Some("09:30".into()), Some("10:30".into())).unwrap();
        // 2024-01-08T15:00:00Z is 10:00 in New York
        assert!(!window.contains(1_704_726_000_i64).unwrap());

        let new_york = window.with_epoch_zone(Timezone::Named(chrono_tz::America::New_York));
        assert!(new_york.contains(1_704_726_000_i64).unwrap());
    }
}
