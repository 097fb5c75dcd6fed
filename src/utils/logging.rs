/// Tracing subscriber setup
use tracing_subscriber::EnvFilter;

use crate::types::Settings;

/// Install a global fmt subscriber filtered by `settings.log_level`.
///
/// `RUST_LOG` wins when set. Returns false if a subscriber was already
/// installed.
pub fn init_tracing(settings: &Settings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

/// Like `init_tracing` but emits one JSON object per event
pub fn init_json_tracing(settings: &Settings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        let settings = Settings::default();
        init_tracing(&settings);
        // A second global subscriber is always refused
        assert!(!init_tracing(&settings));
        assert!(!init_json_tracing(&settings));
    }
}
