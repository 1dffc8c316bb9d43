//! General time utility functions

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a period in seconds into a `std::time::Duration`.
///
/// Negative, zero, non-finite or unrepresentably long periods return `None`.
pub fn period_from_secs(period_s: f64) -> Option<std::time::Duration> {
    if period_s.is_finite() && period_s > 0.0 {
        std::time::Duration::try_from_secs_f64(period_s).ok()
    } else {
        None
    }
}

/// Convert a non-negative number of seconds into a `std::time::Duration`.
///
/// Negative, non-finite or unrepresentably long values return `None`.
pub fn duration_from_secs(secs: f64) -> Option<std::time::Duration> {
    if secs.is_finite() && secs >= 0.0 {
        std::time::Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_period_from_secs() {
        assert_eq!(
            period_from_secs(0.01),
            Some(std::time::Duration::from_millis(10))
        );
        assert_eq!(period_from_secs(0.0), None);
        assert_eq!(period_from_secs(-1.0), None);
        assert_eq!(period_from_secs(f64::NAN), None);
        assert_eq!(period_from_secs(1e30), None);
    }

    #[test]
    fn test_duration_from_secs() {
        assert_eq!(
            duration_from_secs(0.0),
            Some(std::time::Duration::from_secs(0))
        );
        assert_eq!(
            duration_from_secs(2.0),
            Some(std::time::Duration::from_secs(2))
        );
        assert_eq!(duration_from_secs(-0.5), None);
        assert_eq!(duration_from_secs(f64::INFINITY), None);
        assert_eq!(duration_from_secs(1e30), None);
        assert!(duration_from_secs(1e19).is_some());
    }
}
