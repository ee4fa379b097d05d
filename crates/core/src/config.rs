use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Correlation window applied when a rule declares a frequency but no
/// timeframe of its own.
pub const DEFAULT_TIMEFRAME_SECS: u32 = 360;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    pub default_timeframe_secs: u32,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            default_timeframe_secs: DEFAULT_TIMEFRAME_SECS,
        }
    }
}

impl CorrelationConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            default_timeframe_secs: env_u32("LOGHOUND_DEFAULT_TIMEFRAME", DEFAULT_TIMEFRAME_SECS),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!(
            "Correlation config loaded: default_timeframe={}s",
            self.default_timeframe_secs
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // single test: the env var must not be touched from two threads
    #[test]
    fn from_env_reads_override_and_falls_back() {
        env::remove_var("LOGHOUND_DEFAULT_TIMEFRAME");
        assert_eq!(
            CorrelationConfig::from_env().default_timeframe_secs,
            DEFAULT_TIMEFRAME_SECS
        );

        env::set_var("LOGHOUND_DEFAULT_TIMEFRAME", "120");
        assert_eq!(CorrelationConfig::from_env().default_timeframe_secs, 120);

        env::set_var("LOGHOUND_DEFAULT_TIMEFRAME", "not-a-number");
        assert_eq!(
            CorrelationConfig::from_env().default_timeframe_secs,
            DEFAULT_TIMEFRAME_SECS
        );

        env::remove_var("LOGHOUND_DEFAULT_TIMEFRAME");
    }

    #[test]
    fn default_matches_global_constant() {
        assert_eq!(
            CorrelationConfig::default().default_timeframe_secs,
            DEFAULT_TIMEFRAME_SECS
        );
    }
}
