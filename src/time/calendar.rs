/// Market calendars: which dates an exchange trades on
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{debug, warn};

use crate::error::{Result, TimeError};
use crate::time::holidays::{nse_holidays, HolidayRules};
use crate::types::{epoch_to_utc, MarketOverrides, TimePoint, Timezone};

/// Longest closure streak `next_trading_day` walks through before giving up
const MAX_CLOSED_STREAK: i64 = 31;

/// A source of trading days for one market
pub trait TradingCalendar: Send + Sync {
    fn code(&self) -> &str;

    /// Trading days in the inclusive range `[start, end]`, in order.
    ///
    /// `timezone` is the zone the caller's dates are expressed in.
    fn valid_days(&self, start: NaiveDate, end: NaiveDate, timezone: &Timezone) -> Result<Vec<NaiveDate>>;

    fn is_trading_day(&self, date: NaiveDate) -> Result<bool> {
        Ok(self.valid_days(date, date, &Timezone::utc())?.contains(&date))
    }

    fn next_trading_day(&self, from_date: NaiveDate) -> Result<NaiveDate> {
        let start = from_date + chrono::Duration::days(1);
        let end = from_date + chrono::Duration::days(MAX_CLOSED_STREAK);

        self.valid_days(start, end, &Timezone::utc())?
            .into_iter()
            .next()
            .ok_or_else(|| {
                TimeError::CalendarSource(format!(
                    "{}: no trading day within {} days after {}",
                    self.code(),
                    MAX_CLOSED_STREAK,
                    from_date
                ))
            })
    }
}

/// Looks up calendars by market code
pub trait CalendarSource {
    fn calendar(&self, market: &str) -> Result<Arc<dyn TradingCalendar>>;
}

/// A calendar defined by weekend days and holiday rules
#[derive(Debug, Clone)]
pub struct RuleCalendar {
    code: String,
    weekend: Vec<Weekday>,
    rules: HolidayRules,
    extra_holidays: HashSet<NaiveDate>,
}

impl RuleCalendar {
    pub fn new(code: &str, rules: HolidayRules) -> Self {
        RuleCalendar {
            code: code.to_string(),
            weekend: vec![Weekday::Sat, Weekday::Sun],
            rules,
            extra_holidays: HashSet::new(),
        }
    }

    pub fn with_extra_holidays<I: IntoIterator<Item = NaiveDate>>(mut self, dates: I) -> Self {
        self.extra_holidays.extend(dates);
        self
    }

    /// Weekends and extra holidays are always known; any other date needs
    /// holiday rules covering its year.
    pub fn is_open_on(&self, date: NaiveDate) -> Result<bool> {
        if self.weekend.contains(&date.weekday()) || self.extra_holidays.contains(&date) {
            return Ok(false);
        }

        if !self.rules.covers(date.year()) {
            return Err(TimeError::CalendarSource(format!(
                "{}: no holiday data for {} (needed for {})",
                self.code,
                date.year(),
                date
            )));
        }

        Ok(!self.rules.is_holiday(date))
    }
}

impl TradingCalendar for RuleCalendar {
    fn code(&self) -> &str {
        &self.code
    }

    fn valid_days(&self, start: NaiveDate, end: NaiveDate, timezone: &Timezone) -> Result<Vec<NaiveDate>> {
        debug!("{}: valid days {} to {} ({})", self.code, start, end, timezone);

        let mut days = Vec::new();
        for date in start.iter_days().take_while(|date| *date <= end) {
            if self.is_open_on(date)? {
                days.push(date);
            }
        }

        Ok(days)
    }
}

/// The bundled exchange calendars.
///
/// Codes: NYSE (XNYS, NASDAQ), BMV (XMEX), NSE (XNSE), MCX.
#[derive(Debug, Clone, Default)]
pub struct BuiltinCalendars {
    overrides: BTreeMap<String, MarketOverrides>,
}

impl BuiltinCalendars {
    pub fn new() -> Self {
        BuiltinCalendars::default()
    }

    /// Market keys are matched case-insensitively, since layered config
    /// sources lowercase them.
    pub fn with_overrides(overrides: &BTreeMap<String, MarketOverrides>) -> Self {
        BuiltinCalendars {
            overrides: overrides
                .iter()
                .map(|(market, extra)| (market.to_ascii_uppercase(), extra.clone()))
                .collect(),
        }
    }

    pub fn markets() -> &'static [&'static str] {
        &["NYSE", "XNYS", "NASDAQ", "BMV", "XMEX", "NSE", "XNSE", "MCX"]
    }

    fn extra_holidays(&self, market: &str, code: &str) -> Vec<NaiveDate> {
        [market, code]
            .iter()
            .filter_map(|key| self.overrides.get(*key))
            .flat_map(|overrides| overrides.extra_holidays.iter().copied())
            .collect()
    }
}

impl CalendarSource for BuiltinCalendars {
    fn calendar(&self, market: &str) -> Result<Arc<dyn TradingCalendar>> {
        let (code, rules) = match market {
            "NYSE" | "XNYS" | "NASDAQ" => ("NYSE", HolidayRules::Nyse),
            "BMV" | "XMEX" => ("BMV", HolidayRules::Bmv),
            "NSE" | "XNSE" => ("NSE", HolidayRules::Table(nse_holidays())),
            // Closed on exchange-wide holidays, evening sessions included
            "MCX" => ("MCX", HolidayRules::Table(nse_holidays())),
            _ => {
                return Err(TimeError::UnknownMarket(format!(
                    "'{}' is not a known market. Known markets: {}",
                    market,
                    BuiltinCalendars::markets().join(", ")
                )))
            }
        };

        let calendar = RuleCalendar::new(code, rules).with_extra_holidays(self.extra_holidays(market, code));
        Ok(Arc::new(calendar))
    }
}

/// Check whether `market` trades on the date of `point`, using the bundled calendars
pub fn is_market_open(point: impl Into<TimePoint>, market: &str) -> Result<bool> {
    is_market_open_with(&BuiltinCalendars::new(), point, market)
}

/// Check whether `market` trades on the date of `point`.
///
/// A timestamp is reduced to its date in its own timezone. The source is
/// asked for the trading days from the day before to the day after, and only
/// the exact date counts.
pub fn is_market_open_with<S: CalendarSource + ?Sized>(
    source: &S,
    point: impl Into<TimePoint>,
    market: &str,
) -> Result<bool> {
    let (date, timezone) = market_date(point.into())?;

    let calendar = source.calendar(market).map_err(|e| {
        warn!("Calendar lookup for {} failed: {} ({})", market, e, e.error_code());
        e
    })?;

    let start = date.pred_opt().unwrap_or(date);
    let end = date.succ_opt().unwrap_or(date);
    let valid_days = calendar.valid_days(start, end, &timezone)?;

    let open = valid_days.contains(&date);
    debug!("{} on {} ({}): open = {}", market, date, timezone, open);
    Ok(open)
}

fn market_date(point: TimePoint) -> Result<(NaiveDate, Timezone)> {
    match point {
        TimePoint::Zoned(datetime) => Ok((datetime.date_naive(), Timezone::Fixed(*datetime.offset()))),
        TimePoint::Naive(datetime) => Ok((datetime.date(), Timezone::utc())),
        TimePoint::Date(date) => Ok((date, Timezone::utc())),
        TimePoint::Epoch(seconds) => Ok((epoch_to_utc(seconds)?.date_naive(), Timezone::utc())),
        other => Err(TimeError::type_mismatch("point", "datetime or date", other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};
    use std::sync::Mutex;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekend() {
        assert!(!is_market_open(ymd(2025, 1, 4), "NYSE").unwrap()); // Saturday
        assert!(!is_market_open(ymd(2025, 1, 5), "NYSE").unwrap()); // Sunday
    }

    #[test]
    fn test_regular_weekday() {
        assert!(is_market_open(ymd(2025, 1, 6), "NYSE").unwrap());
        assert!(is_market_open(ymd(2025, 1, 6), "BMV").unwrap());
        assert!(is_market_open(ymd(2025, 1, 6), "MCX").unwrap());
    }

    #[test]
    fn test_holidays() {
        assert!(!is_market_open(ymd(2025, 7, 4), "NYSE").unwrap());
        assert!(is_market_open(ymd(2025, 7, 4), "BMV").unwrap());
        assert!(!is_market_open(ymd(2025, 9, 16), "BMV").unwrap());
        assert!(!is_market_open(ymd(2025, 2, 26), "NSE").unwrap());
    }

    #[test]
    fn test_holiday_table_years() {
        // Diwali Laxmi Pujan
        assert!(!is_market_open(ymd(2024, 11, 1), "NSE").unwrap());
        assert!(!is_market_open(ymd(2024, 11, 1), "MCX").unwrap());
        assert!(is_market_open(ymd(2024, 11, 4), "NSE").unwrap());

        let err = is_market_open(ymd(2023, 11, 13), "NSE").unwrap_err();
        assert!(matches!(err, TimeError::CalendarSource(_)));
        assert!(matches!(
            is_market_open(ymd(2026, 3, 3), "MCX"),
            Err(TimeError::CalendarSource(_))
        ));

        // Weekends need no table
        let nse = BuiltinCalendars::new().calendar("NSE").unwrap();
        assert!(!nse.is_trading_day(ymd(2026, 1, 3)).unwrap());
    }

    #[test]
    fn test_timestamp_uses_its_own_date() {
        // Monday 23:30 in New York is already Tuesday in UTC
        let late = chrono_tz::America::New_York.with_ymd_and_hms(2025, 1, 6, 23, 30, 0).unwrap();
        assert!(is_market_open(late, "NYSE").unwrap());

        // Saturday morning in Tokyo is still Friday in UTC
        let tokyo = chrono_tz::Asia::Tokyo.with_ymd_and_hms(2025, 1, 4, 8, 0, 0).unwrap();
        assert!(!is_market_open(tokyo, "NYSE").unwrap());
        assert!(is_market_open(tokyo.with_timezone(&chrono::Utc), "NYSE").unwrap());
    }

    #[test]
    fn test_naive_and_epoch_points() {
        let naive = ymd(2025, 1, 4).and_hms_opt(12, 0, 0).unwrap();
        assert!(!is_market_open(naive, "NYSE").unwrap());

        // 2024-01-08T15:00:00Z, a Monday
        assert!(is_market_open(1_704_726_000_i64, "NYSE").unwrap());
    }

    #[test]
    fn test_type_mismatch() {
        let time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert!(matches!(
            is_market_open(time, "NYSE"),
            Err(TimeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            is_market_open("2025-01-06", "NYSE"),
            Err(TimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_market() {
        let err = is_market_open(ymd(2025, 1, 6), "XXXX").unwrap_err();
        assert!(matches!(err, TimeError::UnknownMarket(_)));
        // Codes pass through verbatim
        assert!(is_market_open(ymd(2025, 1, 6), "nyse").is_err());
    }

    #[test]
    fn test_extra_holidays() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "nyse".to_string(),
            MarketOverrides {
                extra_holidays: vec![ymd(2025, 1, 9)],
            },
        );
        let source = BuiltinCalendars::with_overrides(&overrides);

        assert!(!is_market_open_with(&source, ymd(2025, 1, 9), "NYSE").unwrap());
        assert!(!is_market_open_with(&source, ymd(2025, 1, 9), "XNYS").unwrap());
        assert!(is_market_open(ymd(2025, 1, 9), "NYSE").unwrap());
    }

    #[test]
    fn test_next_trading_day() {
        let nyse = BuiltinCalendars::new().calendar("NYSE").unwrap();
        // Thanksgiving 2025 is Thursday the 27th
        assert_eq!(nyse.next_trading_day(ymd(2025, 11, 26)).unwrap(), ymd(2025, 11, 28));
        assert_eq!(nyse.next_trading_day(ymd(2025, 1, 3)).unwrap(), ymd(2025, 1, 6));
        assert!(nyse.is_trading_day(ymd(2025, 11, 28)).unwrap());
        assert!(!nyse.is_trading_day(ymd(2025, 11, 27)).unwrap());
    }

    struct RecordingCalendar {
        requests: Mutex<Vec<(NaiveDate, NaiveDate, Timezone)>>,
        days: Vec<NaiveDate>,
    }

    impl TradingCalendar for RecordingCalendar {
        fn code(&self) -> &str {
            "TEST"
        }

        fn valid_days(&self, start: NaiveDate, end: NaiveDate, timezone: &Timezone) -> Result<Vec<NaiveDate>> {
            self.requests.lock().unwrap().push((start, end, *timezone));
            Ok(self.days.clone())
        }
    }

    struct SingleSource(Arc<RecordingCalendar>);

    impl CalendarSource for SingleSource {
        fn calendar(&self, market: &str) -> Result<Arc<dyn TradingCalendar>> {
            if market == "TEST" {
                Ok(self.0.clone())
            } else {
                Err(TimeError::UnknownMarket(market.to_string()))
            }
        }
    }

    #[test]
    fn test_source_receives_padded_window() {
        let calendar = Arc::new(RecordingCalendar {
            requests: Mutex::new(Vec::new()),
            days: vec![ymd(2025, 1, 5), ymd(2025, 1, 7)],
        });
        let source = SingleSource(calendar.clone());

        let point = chrono::FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 6, 10, 0, 0)
            .unwrap();

        // Padding days are returned but the exact date is not among them
        assert!(!is_market_open_with(&source, point, "TEST").unwrap());

        let requests = calendar.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, ymd(2025, 1, 5));
        assert_eq!(requests[0].1, ymd(2025, 1, 7));
        assert_eq!(requests[0].2.name(), "UTC-05:00");
    }

    struct FailingSource;

    impl CalendarSource for FailingSource {
        fn calendar(&self, _market: &str) -> Result<Arc<dyn TradingCalendar>> {
            Err(TimeError::CalendarSource("calendar service unavailable".to_string()))
        }
    }

    #[test]
    fn test_source_failure_is_surfaced() {
        let err = is_market_open_with(&FailingSource, ymd(2025, 1, 6), "NYSE").unwrap_err();
        assert!(matches!(err, TimeError::CalendarSource(_)));
    }
}
