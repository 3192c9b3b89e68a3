//! Exponential backoff schedule for provider retries.

use std::time::Duration;

use domain::RetrySettings;

/// Delay to wait after a failed attempt, 1-based.
///
/// Doubles from `initial_delay` and saturates at `max_delay`, so the default
/// settings yield 1s, 2s, 4s, 8s, 16s, 16s, ...
pub fn delay_for_attempt(settings: &RetrySettings, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(30);
    let delay = settings
        .initial_delay
        .saturating_mul(2u32.saturating_pow(exponent));
    delay.min(settings.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_until_capped() {
        let settings = RetrySettings::default();
        let secs: Vec<u64> = (1..=6)
            .map(|attempt| delay_for_attempt(&settings, attempt).as_secs())
            .collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 16]);
    }

    #[test]
    fn test_large_attempt_does_not_overflow() {
        let settings = RetrySettings::default();
        assert_eq!(delay_for_attempt(&settings, u32::MAX), settings.max_delay);
    }
}
