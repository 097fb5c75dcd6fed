/// Timezone resolution from canonical names and city queries
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use chrono_tz::{OffsetComponents, Tz};
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::error::{Result, TimeError};
use crate::time::registry::COUNTRY_TIMEZONES;
use crate::types::Timezone;

/// Every zone in the built-in registry, joined for help and error text.
///
/// Resolution never consults this string.
pub static TIMEZONE_LISTING: Lazy<String> = Lazy::new(|| {
    COUNTRY_TIMEZONES
        .iter()
        .flat_map(|(_, cities)| cities.iter().copied())
        .collect::<Vec<_>>()
        .join(", ")
});

/// Resolve a canonical timezone name.
///
/// Accepts IANA names ("America/New_York", "UTC") and fixed offsets
/// ("UTC-4", "UTC+05:30", "GMT+2"). There is no fuzzy fallback.
pub fn resolve_timezone(query: &str) -> Result<Timezone> {
    let query = query.trim();

    if let Ok(tz) = query.parse::<Tz>() {
        return Ok(Timezone::Named(tz));
    }

    if let Some(offset) = parse_fixed_offset(query) {
        return Ok(Timezone::Fixed(offset));
    }

    warn!("Timezone query did not resolve: {:?}", query);
    Err(TimeError::UnresolvedTimezone(format!(
        "Couldn't find a timezone for '{}'.",
        query
    )))
}

/// "UTC-4", "UTC+5:30", "GMT+0530"; the sign is relative to UTC, so "UTC-4"
/// is four hours behind.
fn parse_fixed_offset(query: &str) -> Option<FixedOffset> {
    let rest = query
        .strip_prefix("UTC")
        .or_else(|| query.strip_prefix("GMT"))?;

    let (sign, digits) = match rest.chars().next()? {
        '+' => (1, &rest[1..]),
        '-' => (-1, &rest[1..]),
        _ => return None,
    };
    if !digits.is_ascii() {
        return None;
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() > 2 => digits.split_at(digits.len() - 2),
        None => (digits, "0"),
    };

    if hours.is_empty() || !hours.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !minutes.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// An ordered list of (country, zone names) used for city lookups
#[derive(Debug, Clone)]
pub struct CityRegistry {
    entries: Vec<(String, Vec<String>)>,
}

impl CityRegistry {
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Self {
        CityRegistry { entries }
    }

    pub fn builtin() -> Self {
        let entries = COUNTRY_TIMEZONES
            .iter()
            .map(|(country, cities)| {
                (
                    country.to_string(),
                    cities.iter().map(|city| city.to_string()).collect(),
                )
            })
            .collect();

        CityRegistry { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, cities)| cities.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the first zone whose name contains `query`.
    ///
    /// Matching is case-sensitive and scans countries and their zones in
    /// registration order. Spaces match underscores, so "New York" finds
    /// "America/New_York". Short queries match liberally ("York", "on").
    pub fn resolve(&self, query: &str) -> Result<Timezone> {
        let needle = query.trim().replace(' ', "_");

        if !needle.is_empty() {
            for (country, cities) in &self.entries {
                for city in cities {
                    if city.contains(needle.as_str()) {
                        debug!("City query {:?} matched {} ({})", query, city, country);
                        return city.parse::<Tz>().map(Timezone::Named).map_err(|_| {
                            TimeError::UnresolvedTimezone(format!(
                                "Registry entry '{}' for '{}' is not a known timezone.",
                                city, query
                            ))
                        });
                    }
                }
            }
        }

        warn!("City query did not resolve: {:?}", query);
        Err(TimeError::UnresolvedTimezone(format!(
            "Couldn't find a timezone for '{}' among {} registered zones (matching is case-sensitive).",
            query,
            self.len()
        )))
    }
}

impl Default for CityRegistry {
    fn default() -> Self {
        CityRegistry::builtin()
    }
}

/// Resolve a city, locale or area name against the built-in registry
pub fn resolve_city_timezone(query: &str) -> Result<Timezone> {
    CityRegistry::builtin().resolve(query)
}

/// Current wall-clock time in a city, DST included
pub fn city_time(query: &str) -> Result<DateTime<FixedOffset>> {
    Ok(resolve_city_timezone(query)?.now())
}

/// Check whether DST is in effect for a wall-clock time in `timezone`.
///
/// `None` means the current UTC time. Wall-clock times that a DST
/// transition skips or repeats are rejected with `AmbiguousLocalTime`.
pub fn is_daylight_saving(instant: Option<NaiveDateTime>, timezone: &Timezone) -> Result<bool> {
    let naive = instant.unwrap_or_else(|| Utc::now().naive_utc());

    match timezone {
        Timezone::Fixed(_) => {
            timezone.localize(&naive)?;
            Ok(false)
        }
        Timezone::Named(tz) => match timezone.localize(&naive) {
            Ok(local) => Ok(dst_active(tz, local.with_timezone(&Utc))),
            Err(e) => {
                warn!("Cannot decide DST for {} in {}: {}", naive, tz.name(), e);
                Err(e)
            }
        },
    }
}

/// Check whether DST is in effect in `timezone` at an absolute instant
pub fn is_daylight_saving_at(instant: DateTime<Utc>, timezone: &Timezone) -> bool {
    match timezone {
        Timezone::Fixed(_) => false,
        Timezone::Named(tz) => dst_active(tz, instant),
    }
}

fn dst_active(tz: &Tz, instant: DateTime<Utc>) -> bool {
    let local = instant.with_timezone(tz);
    local.offset().dst_offset() != chrono::Duration::zero()
}
