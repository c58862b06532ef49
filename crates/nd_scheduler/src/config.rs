use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest interval, retry delay or cooldown honoured; larger values are
/// capped so deadlines stay representable.
pub const MAX_PERIOD_SECS: u64 = 100 * 365 * 24 * 3600;

/// Timing and failure policy of one periodic job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    /// Attempts per cycle before the cycle is abandoned.
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    /// Abandoned cycles in a row before the job pauses.
    pub max_consecutive_failures: u32,
    pub cooldown_secs: u64,
    /// Run once at startup instead of waiting a full interval.
    pub run_immediately: bool,
    /// Log a status report every this many runs; 0 disables it.
    pub report_every: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::fetch()
    }
}

impl ScheduleConfig {
    /// Scrape every 45 minutes.
    pub fn fetch() -> Self {
        Self {
            interval_secs: 45 * 60,
            max_attempts: 3,
            retry_delay_secs: 10,
            max_consecutive_failures: 3,
            cooldown_secs: 60 * 60,
            run_immediately: true,
            report_every: 10,
        }
    }

    /// Retention cleanup twice a day.
    pub fn cleanup() -> Self {
        Self {
            interval_secs: 12 * 60 * 60,
            run_immediately: false,
            ..Self::fetch()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.clamp(1, MAX_PERIOD_SECS))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs.min(MAX_PERIOD_SECS))
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs.min(MAX_PERIOD_SECS) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ScheduleConfig = serde_json::from_str(r#"{"interval_secs": 600}"#).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(600));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(10));
        assert_eq!(config.cooldown(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = ScheduleConfig {
            interval_secs: 0,
            ..ScheduleConfig::fetch()
        };
        assert_eq!(config.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_huge_periods_are_capped() {
        let config = ScheduleConfig {
            interval_secs: u64::MAX,
            retry_delay_secs: u64::MAX,
            cooldown_secs: u64::MAX,
            ..ScheduleConfig::fetch()
        };
        let cap = Duration::from_secs(MAX_PERIOD_SECS);
        assert_eq!(config.interval(), cap);
        assert_eq!(config.retry_delay(), cap);
        assert_eq!(config.cooldown().num_seconds(), MAX_PERIOD_SECS as i64);
        assert!(chrono::Utc::now().checked_add_signed(config.cooldown()).is_some());
    }

    #[test]
    fn test_cleanup_schedule() {
        let config = ScheduleConfig::cleanup();
        assert_eq!(config.interval(), Duration::from_secs(12 * 3600));
        assert!(!config.run_immediately);
    }
}
