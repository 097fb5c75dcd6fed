/// Time-of-day string parsing and formatting
use chrono::NaiveTime;
use tracing::debug;

use crate::error::{Result, TimeError};

/// ISO "HH:MM:SS" with optional fractional seconds, tried before the fixed list
const ISO_TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Accepted time formats, in the order they are tried
pub const TIME_FORMATS: &[&str] = &[
    "%H:%M",
    "%H%M",
    "%I:%M%p",
    "%I%M%p",
    "%H:%M:%S",
    "%H%M%S",
    "%I:%M:%S%p",
    "%I%M%S%p",
];

/// What to do with a string no format accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrors {
    /// Fail with `UnparsableTime`
    #[default]
    Raise,
    /// Yield `None`
    Coerce,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions<'a> {
    /// Only try this format instead of the fixed list
    pub format: Option<&'a str>,
    /// For batches, reuse the format of the first parseable element
    pub infer_format: bool,
    pub errors: ParseErrors,
}

impl<'a> ParseOptions<'a> {
    pub fn coerce() -> Self {
        ParseOptions {
            errors: ParseErrors::Coerce,
            ..Default::default()
        }
    }

    pub fn with_format(format: &'a str) -> Self {
        ParseOptions {
            format: Some(format),
            ..Default::default()
        }
    }
}

/// Parse a time string with the fixed format list, failing on no match
pub fn parse_time(text: &str) -> Result<NaiveTime> {
    try_formats(text.trim(), None).ok_or_else(|| unparsable(text))
}

/// Parse a time string honouring `options`
pub fn parse_time_with(text: &str, options: &ParseOptions<'_>) -> Result<Option<NaiveTime>> {
    finish(text, try_formats(text.trim(), options.format), options.errors)
}

/// Parse a batch of time strings.
///
/// With `infer_format` and no explicit format, the format that parses the
/// first parseable element is used for every element.
pub fn parse_times<S: AsRef<str>>(
    texts: &[S],
    options: &ParseOptions<'_>,
) -> Result<Vec<Option<NaiveTime>>> {
    let format = match (options.format, options.infer_format) {
        (Some(format), _) => Some(format),
        (None, true) => {
            let inferred = texts.iter().find_map(|text| detect_format(text.as_ref()));
            debug!("Inferred time format {:?} for {} values", inferred, texts.len());
            inferred
        }
        (None, false) => None,
    };

    texts
        .iter()
        .map(|text| {
            let text = text.as_ref();
            finish(text, try_formats(text.trim(), format), options.errors)
        })
        .collect()
}

/// The first accepted format that parses `text`
pub fn detect_format(text: &str) -> Option<&'static str> {
    let text = text.trim();
    std::iter::once(ISO_TIME_FORMAT)
        .chain(TIME_FORMATS.iter().copied())
        .find(|format| parse_with(text, format).is_some())
}

pub fn format_time(time: &NaiveTime, format: &str) -> String {
    time.format(format).to_string()
}

fn try_formats(text: &str, format: Option<&str>) -> Option<NaiveTime> {
    match format {
        Some(format) => parse_with(text, format),
        None => std::iter::once(ISO_TIME_FORMAT)
            .chain(TIME_FORMATS.iter().copied())
            .find_map(|format| parse_with(text, format)),
    }
}

/// Parse with `format`, letting compact formats take a one-digit hour
/// ("930" as 09:30, "93015PM" as 21:30:15).
fn parse_with(text: &str, format: &str) -> Option<NaiveTime> {
    if let Ok(time) = NaiveTime::parse_from_str(text, format) {
        return Some(time);
    }

    let compact = format.starts_with("%H%M") || format.starts_with("%I%M");
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if compact && (digits == 3 || digits == 5) {
        NaiveTime::parse_from_str(&format!("0{}", text), format).ok()
    } else {
        None
    }
}

fn finish(text: &str, parsed: Option<NaiveTime>, errors: ParseErrors) -> Result<Option<NaiveTime>> {
    match (parsed, errors) {
        (Some(time), _) => Ok(Some(time)),
        (None, ParseErrors::Coerce) => Ok(None),
        (None, ParseErrors::Raise) => Err(unparsable(text)),
    }
}

fn unparsable(text: &str) -> TimeError {
    TimeError::UnparsableTime(format!("Cannot convert '{}' to a time.", text))
}
