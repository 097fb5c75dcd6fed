/// Exchange holiday calendars
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashSet;

/// NSE trading holidays, one block per published year (update annually).
///
/// Years without a block are not covered; see `HolidayRules::covers`.
const NSE_HOLIDAYS: &[(i32, u32, u32)] = &[
    (2024, 1, 22),  // Special holiday
    (2024, 1, 26),  // Republic Day
    (2024, 3, 8),   // Mahashivratri
    (2024, 3, 25),  // Holi
    (2024, 3, 29),  // Good Friday
    (2024, 4, 11),  // Id-Ul-Fitr
    (2024, 4, 17),  // Shri Ram Navmi
    (2024, 5, 1),   // Maharashtra Day
    (2024, 5, 20),  // General elections
    (2024, 6, 17),  // Bakri Id
    (2024, 7, 17),  // Muharram
    (2024, 8, 15),  // Independence Day
    (2024, 10, 2),  // Mahatma Gandhi Jayanti
    (2024, 11, 1),  // Diwali Laxmi Pujan
    (2024, 11, 15), // Gurunanak Jayanti
    (2024, 11, 20), // Maharashtra assembly elections
    (2024, 12, 25), // Christmas
    (2025, 1, 26),  // Republic Day
    (2025, 2, 26),  // Mahashivratri
    (2025, 3, 14),  // Holi
    (2025, 3, 31),  // Id-Ul-Fitr
    (2025, 4, 10),  // Mahavir Jayanti
    (2025, 4, 14),  // Dr. Ambedkar Jayanti
    (2025, 4, 18),  // Good Friday
    (2025, 5, 1),   // Maharashtra Day
    (2025, 5, 12),  // Buddha Purnima
    (2025, 6, 7),   // Bakri Id
    (2025, 7, 7),   // Muharram
    (2025, 8, 15),  // Independence Day
    (2025, 8, 27),  // Ganesh Chaturthi
    (2025, 9, 5),   // Eid-E-Milad
    (2025, 10, 2),  // Mahatma Gandhi Jayanti
    (2025, 10, 12), // Dussehra
    (2025, 10, 20), // Diwali Balipratipada
    (2025, 10, 21), // Diwali
    (2025, 11, 5),  // Gurunanak Jayanti
    (2025, 12, 25), // Christmas
];

pub fn nse_holidays() -> HashSet<NaiveDate> {
    NSE_HOLIDAYS
        .iter()
        .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .collect()
}

/// How an exchange decides its holidays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HolidayRules {
    /// New York Stock Exchange rules, computed per year
    Nyse,
    /// Bolsa Mexicana de Valores rules, computed per year
    Bmv,
    /// A published list of dates
    Table(HashSet<NaiveDate>),
}

impl HolidayRules {
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        match self {
            HolidayRules::Table(dates) => dates.contains(&date),
            _ => self.holidays_in(date.year()).contains(&date),
        }
    }

    /// Whether the rules know the holidays of `year`.
    ///
    /// Computed rules cover every year; a table only covers the years it
    /// lists dates for.
    pub fn covers(&self, year: i32) -> bool {
        match self {
            HolidayRules::Table(dates) => dates.iter().any(|d| d.year() == year),
            _ => true,
        }
    }

    pub fn holidays_in(&self, year: i32) -> HashSet<NaiveDate> {
        match self {
            HolidayRules::Nyse => nyse_holidays(year),
            HolidayRules::Bmv => bmv_holidays(year),
            HolidayRules::Table(dates) => dates.iter().filter(|d| d.year() == year).copied().collect(),
        }
    }
}

/// NYSE full-day closures for a year.
///
/// Fixed-date holidays falling on Saturday move to Friday and on Sunday to
/// Monday, except New Year's Day which is not observed when it is a
/// Saturday.
pub fn nyse_holidays(year: i32) -> HashSet<NaiveDate> {
    let mut holidays = HashSet::new();

    if let Some(new_year) = NaiveDate::from_ymd_opt(year, 1, 1) {
        match new_year.weekday() {
            Weekday::Sat => {}
            Weekday::Sun => {
                holidays.insert(new_year + Duration::days(1));
            }
            _ => {
                holidays.insert(new_year);
            }
        }
    }

    if year >= 1998 {
        holidays.extend(nth_weekday(year, 1, Weekday::Mon, 3)); // Martin Luther King Jr. Day
    }
    holidays.extend(nth_weekday(year, 2, Weekday::Mon, 3)); // Washington's Birthday
    holidays.extend(easter_sunday(year).map(|easter| easter - Duration::days(2))); // Good Friday
    holidays.extend(nth_weekday(year, 5, Weekday::Mon, -1)); // Memorial Day
    if year >= 2022 {
        holidays.extend(observed(year, 6, 19)); // Juneteenth
    }
    holidays.extend(observed(year, 7, 4)); // Independence Day
    holidays.extend(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
    holidays.extend(nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving
    holidays.extend(observed(year, 12, 25)); // Christmas

    holidays
}

/// BMV closures for a year; weekend holidays are not moved
pub fn bmv_holidays(year: i32) -> HashSet<NaiveDate> {
    let mut holidays = HashSet::new();

    holidays.extend(NaiveDate::from_ymd_opt(year, 1, 1)); // Año Nuevo
    holidays.extend(nth_weekday(year, 2, Weekday::Mon, 1)); // Día de la Constitución
    holidays.extend(nth_weekday(year, 3, Weekday::Mon, 3)); // Natalicio de Benito Juárez
    if let Some(easter) = easter_sunday(year) {
        holidays.insert(easter - Duration::days(3)); // Jueves Santo
        holidays.insert(easter - Duration::days(2)); // Viernes Santo
    }
    holidays.extend(NaiveDate::from_ymd_opt(year, 5, 1)); // Día del Trabajo
    holidays.extend(NaiveDate::from_ymd_opt(year, 9, 16)); // Día de la Independencia
    holidays.extend(nth_weekday(year, 11, Weekday::Mon, 3)); // Día de la Revolución
    holidays.extend(NaiveDate::from_ymd_opt(year, 12, 12)); // Día de la Virgen de Guadalupe
    holidays.extend(NaiveDate::from_ymd_opt(year, 12, 25)); // Navidad

    holidays
}

/// Move a Saturday date to Friday and a Sunday date to Monday
fn observed(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    })
}

/// Western (Gregorian) Easter Sunday
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// The `ordinal`-th `weekday` of a month; negative ordinals count from the end
pub fn nth_weekday(year: i32, month: u32, weekday: Weekday, ordinal: i32) -> Option<NaiveDate> {
    if ordinal > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let diff = (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
        let target = first + Duration::days(diff as i64) + Duration::weeks((ordinal - 1) as i64);
        (target.month() == month).then_some(target)
    } else if ordinal < 0 {
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
        let diff = (last.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
        let target = last - Duration::days(diff as i64) - Duration::weeks((-ordinal - 1) as i64);
        (target.month() == month).then_some(target)
    } else {
        None
    }
}
