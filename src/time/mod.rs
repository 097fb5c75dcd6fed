pub mod calendar;
pub mod holidays;
pub mod parse;
pub mod range;
pub mod registry;
pub mod window;
pub mod zones;

pub use calendar::{is_market_open, is_market_open_with, BuiltinCalendars, CalendarSource, RuleCalendar, TradingCalendar};
pub use parse::{detect_format, format_time, parse_time, parse_time_with, parse_times, ParseErrors, ParseOptions};
pub use range::{date_in_range, time_in_range, RangeEngine};
pub use window::{TimeWindow, WindowBounds};
pub use zones::{
    city_time, is_daylight_saving, is_daylight_saving_at, resolve_city_timezone, resolve_timezone, CityRegistry,
    TIMEZONE_LISTING,
};
