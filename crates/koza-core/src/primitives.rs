//! # Fixed Primitives
//!
//! Compiled-in limits and defaults for the KozaTakip core.
//!
//! Scoring constants that belong to a single heuristic live next to that
//! heuristic (`stability`, `quality`); this module holds the limits shared by
//! the storage, validation and query paths.

/// Default number of messages returned by a list query.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Upper bound on any list query.
///
/// All queries must be computationally bounded.
pub const MAX_LIST_LIMIT: usize = 1000;

/// Default lookback window (environment reports) for the stability score.
pub const STABILITY_LOOKBACK: usize = 60;

/// Milliseconds in one day, used by auto-stage progression.
pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a report timestamp string.
pub const MAX_TIMESTAMP_LENGTH: usize = 64;

/// Maximum length for free-form labels (stage, disease, market recommendation).
pub const MAX_LABEL_LENGTH: usize = 256;

/// Maximum number of recommended actions in a single report.
pub const MAX_ACTIONS_PER_REPORT: usize = 32;

/// Maximum stored length of an audit entry's client address.
pub const MAX_CLIENT_IP_LENGTH: usize = 64;

/// Maximum stored length of an audit entry's user agent.
pub const MAX_USER_AGENT_LENGTH: usize = 255;

/// Clamp a requested list limit into `0..=MAX_LIST_LIMIT`.
#[must_use]
pub fn bounded_limit(requested: usize) -> usize {
    requested.min(MAX_LIST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_per_day_is_exact() {
        assert_eq!(MS_PER_DAY, 86_400_000);
    }

    #[test]
    fn limits_are_bounded() {
        assert_eq!(bounded_limit(10), 10);
        assert_eq!(bounded_limit(usize::MAX), MAX_LIST_LIMIT);
        assert!(STABILITY_LOOKBACK <= MAX_LIST_LIMIT);
    }
}
