use chrono::Duration;

use crate::env_or;

/// Lifetimes of issued tokens and verification codes.
///
/// # Environment Variables
///
/// - `ACCESS_TOKEN_TTL_SECONDS` (default: `7200`, 2 hours)
/// - `REFRESH_TOKEN_TTL_SECONDS` (default: `604800`, 7 days)
/// - `REFRESH_RENEWAL_THRESHOLD_SECONDS` (default: `259200`, 72 hours)
/// - `VERIFICATION_CODE_TTL_SECONDS` (default: `300`, 5 minutes)
#[derive(Clone, Debug)]
pub struct TokenConfig {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// A refresh token with less remaining lifetime than this is rotated on use.
    pub refresh_renewal_threshold: Duration,
    pub verification_code_ttl: Duration,
}

impl TokenConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            access_token_ttl: seconds_or("ACCESS_TOKEN_TTL_SECONDS", defaults.access_token_ttl),
            refresh_token_ttl: seconds_or("REFRESH_TOKEN_TTL_SECONDS", defaults.refresh_token_ttl),
            refresh_renewal_threshold: seconds_or(
                "REFRESH_RENEWAL_THRESHOLD_SECONDS",
                defaults.refresh_renewal_threshold,
            ),
            verification_code_ttl: seconds_or(
                "VERIFICATION_CODE_TTL_SECONDS",
                defaults.verification_code_ttl,
            ),
        }
    }
}

/// Reads a whole number of seconds, keeping `default` when the value is
/// unset, malformed, or too large for a `Duration`.
fn seconds_or(key: &str, default: Duration) -> Duration {
    duration_from_secs(env_or(key, default.num_seconds()), default)
}

fn duration_from_secs(secs: i64, default: Duration) -> Duration {
    Duration::try_seconds(secs).unwrap_or(default)
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::hours(2),
            refresh_token_ttl: Duration::days(7),
            refresh_renewal_threshold: Duration::hours(72),
            verification_code_ttl: Duration::minutes(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TokenConfig::default();
        assert_eq!(config.access_token_ttl.num_seconds(), 7200);
        assert_eq!(config.refresh_token_ttl.num_seconds(), 604800);
        assert_eq!(config.refresh_renewal_threshold.num_hours(), 72);
        assert_eq!(config.verification_code_ttl.num_minutes(), 5);
    }

    #[test]
    fn test_oversized_seconds_fall_back_to_default() {
        let default = Duration::hours(2);

        assert_eq!(duration_from_secs(i64::MAX, default), default);
        assert_eq!(duration_from_secs(90, default), Duration::seconds(90));
    }
}
