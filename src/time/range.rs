/// Time-of-day and timestamp range checks
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use tracing::debug;

use crate::error::{Result, TimeError};
use crate::time::parse::parse_time;
use crate::types::{epoch_to_utc, TimePoint, Timezone, WrapMode};

/// Range checks with a fixed wrap behaviour and epoch timezone.
///
/// The epoch timezone decides which wall-clock time an epoch value maps to,
/// and which zone a naive timestamp is taken to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeEngine {
    wrap_mode: WrapMode,
    epoch_zone: Timezone,
}

impl Default for RangeEngine {
    fn default() -> Self {
        RangeEngine {
            wrap_mode: WrapMode::Literal,
            epoch_zone: Timezone::utc(),
        }
    }
}

impl RangeEngine {
    pub fn new(wrap_mode: WrapMode, epoch_zone: Timezone) -> Self {
        RangeEngine {
            wrap_mode,
            epoch_zone,
        }
    }

    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    pub fn epoch_zone(&self) -> Timezone {
        self.epoch_zone
    }

    /// Check whether the time of day of `point` lies between `from` and `to`.
    ///
    /// Either bound may be omitted for an open-ended check. When `to` is
    /// earlier than `from` the configured `WrapMode` decides membership.
    pub fn time_in_range(
        &self,
        point: impl Into<TimePoint>,
        from: Option<TimePoint>,
        to: Option<TimePoint>,
    ) -> Result<bool> {
        let point = self.time_of_day(&point.into())?;
        let from = from.map(|bound| time_bound("from", bound)).transpose()?;
        let to = to.map(|bound| time_bound("to", bound)).transpose()?;

        check_bounds(point, from, to, self.wrap_mode)
    }

    /// Check whether the instant `point` lies between `from` and `to`.
    ///
    /// A `to` before `from` always takes the literal rule: the instant is
    /// inside when `to <= point <= from`. `WrapMode` only applies to times of
    /// day.
    pub fn date_in_range(
        &self,
        point: impl Into<TimePoint>,
        from: Option<TimePoint>,
        to: Option<TimePoint>,
    ) -> Result<bool> {
        let point = self.instant("point", point.into())?;
        let from = from.map(|bound| self.instant("from", bound)).transpose()?;
        let to = to.map(|bound| self.instant("to", bound)).transpose()?;

        check_bounds(point, from, to, WrapMode::Literal)
    }

    fn time_of_day(&self, point: &TimePoint) -> Result<NaiveTime> {
        match point {
            TimePoint::Time(time) => Ok(*time),
            TimePoint::Naive(datetime) => Ok(datetime.time()),
            TimePoint::Zoned(datetime) => Ok(datetime.time()),
            TimePoint::Epoch(seconds) => Ok(self.epoch_zone.from_utc(epoch_to_utc(*seconds)?).time()),
            TimePoint::Text(text) => parse_time(text),
            TimePoint::Date(_) => Err(TimeError::type_mismatch(
                "point",
                "datetime, time, float or str",
                point.kind(),
            )),
        }
    }

    fn instant(&self, argument: &str, point: TimePoint) -> Result<DateTime<Utc>> {
        match point {
            TimePoint::Zoned(datetime) => Ok(datetime.with_timezone(&Utc)),
            TimePoint::Naive(datetime) => Ok(self.epoch_zone.localize(&datetime)?.with_timezone(&Utc)),
            TimePoint::Epoch(seconds) => epoch_to_utc(seconds),
            TimePoint::Text(text) => self.parse_instant(&text),
            other => Err(TimeError::type_mismatch(argument, "datetime or float", other.kind())),
        }
    }

    fn parse_instant(&self, text: &str) -> Result<DateTime<Utc>> {
        let text = text.trim();
        if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
            return Ok(datetime.with_timezone(&Utc));
        }

        let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map_err(|_| {
            TimeError::UnparsableTime(format!("Cannot convert '{}' to a datetime.", text))
        })?;
        Ok(self.epoch_zone.localize(&naive)?.with_timezone(&Utc))
    }
}

fn time_bound(argument: &str, bound: TimePoint) -> Result<NaiveTime> {
    match bound {
        TimePoint::Time(time) => Ok(time),
        TimePoint::Text(text) => parse_time(&text),
        other => Err(TimeError::type_mismatch(argument, "time or str", other.kind())),
    }
}

fn check_bounds<T: PartialOrd + std::fmt::Debug>(
    point: T,
    from: Option<T>,
    to: Option<T>,
    wrap: WrapMode,
) -> Result<bool> {
    match (from, to) {
        (None, None) => Err(TimeError::InvalidRange(
            "'from' and 'to' can't both be None. Pass 'from' to check that the value is after it, \
             'to' to check that it is before it, or both."
                .to_string(),
        )),
        (None, Some(to)) => Ok(point <= to),
        (Some(from), None) => Ok(point >= from),
        (Some(from), Some(to)) if from <= to => Ok(point >= from && point <= to),
        (Some(from), Some(to)) => {
            let inside = match wrap {
                WrapMode::Literal => point >= to && point <= from,
                WrapMode::Overnight => point >= from || point <= to,
            };
            debug!(
                "Inverted range {:?} -> {:?} ({:?}): {:?} inside = {}",
                from, to, wrap, point, inside
            );
            Ok(inside)
        }
    }
}

/// `RangeEngine::time_in_range` with literal wrapping and UTC epoch times
pub fn time_in_range(
    point: impl Into<TimePoint>,
    from: Option<TimePoint>,
    to: Option<TimePoint>,
) -> Result<bool> {
    RangeEngine::default().time_in_range(point, from, to)
}

/// `RangeEngine::date_in_range` with UTC for naive and epoch values
pub fn date_in_range(
    point: impl Into<TimePoint>,
    from: Option<TimePoint>,
    to: Option<TimePoint>,
) -> Result<bool> {
    RangeEngine::default().date_in_range(point, from, to)
}
