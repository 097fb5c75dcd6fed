/// Centralized error types for the time-domain utilities
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeError {
    // Timezone Errors
    #[error("Unresolved timezone: {0}")]
    UnresolvedTimezone(String),

    #[error("Ambiguous local time: {0}")]
    AmbiguousLocalTime(String),

    // Range Errors
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Type mismatch for '{argument}': expected {expected}, got {found}")]
    TypeMismatch {
        argument: String,
        expected: String,
        found: String,
    },

    // Parse Errors
    #[error("Unparsable time: {0}")]
    UnparsableTime(String),

    // Market Calendar Errors
    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    #[error("Calendar source failed: {0}")]
    CalendarSource(String),

    // Window Errors
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // File I/O Errors
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TimeError>;

impl TimeError {
    pub(crate) fn type_mismatch(argument: &str, expected: &str, found: &str) -> Self {
        TimeError::TypeMismatch {
            argument: argument.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Check if the error was caused by the value the caller passed in
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TimeError::UnresolvedTimezone(_)
                | TimeError::AmbiguousLocalTime(_)
                | TimeError::InvalidRange(_)
                | TimeError::TypeMismatch { .. }
                | TimeError::UnparsableTime(_)
                | TimeError::UnknownMarket(_)
        )
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            TimeError::UnresolvedTimezone(_) => "TZ_001",
            TimeError::AmbiguousLocalTime(_) => "TZ_002",
            TimeError::InvalidRange(_) => "RANGE_001",
            TimeError::TypeMismatch { .. } => "RANGE_002",
            TimeError::UnparsableTime(_) => "PARSE_001",
            TimeError::UnknownMarket(_) => "MKT_001",
            TimeError::CalendarSource(_) => "MKT_002",
            TimeError::InvalidWindow(_) => "WIN_001",
            TimeError::ConfigError(_) => "CFG_001",
            TimeError::FileError(_) => "FILE_001",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TimeError::InvalidRange("x".into()).error_code(), "RANGE_001");
        assert_eq!(
            TimeError::type_mismatch("point", "time", "date").error_code(),
            "RANGE_002"
        );
    }

    #[test]
    fn test_input_errors() {
        assert!(TimeError::UnknownMarket("XXXX".into()).is_input_error());
        assert!(!TimeError::CalendarSource("down".into()).is_input_error());
        assert!(!TimeError::InvalidWindow("empty".into()).is_input_error());
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = TimeError::type_mismatch("from", "time or str", "date");
        assert_eq!(
            err.to_string(),
            "Type mismatch for 'from': expected time or str, got date"
        );
    }
}
