//! Hot-rank calculation.
//!
//! A post's hot score is a logarithmic vote term minus a linear age term:
//! every 45 000 seconds (12.5 hours) of age costs one order of magnitude of
//! net score. The value is materialized on the post whenever its score is
//! recomputed, so listing by hot rank is a plain indexed sort.

use chrono::{DateTime, Utc};

/// Seconds of age that cancel out one order of magnitude of score.
pub const DECAY_SECONDS: f64 = 45_000.0;

/// Hot score for a net `score` at `now`, for a post created at `created_at`.
///
/// Age is clamped at zero so clock skew between writers cannot boost a post.
pub fn hot_score(score: i64, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let sign = score.signum() as f64;
    let order = (score.unsigned_abs().max(1) as f64).log10();
    sign * order - age_seconds(created_at, now) / DECAY_SECONDS
}

fn age_seconds(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age = now.signed_duration_since(created_at);
    if age <= chrono::Duration::zero() {
        return 0.0;
    }
    age.num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_post_with_zero_score() {
        assert_eq!(hot_score(0, t0(), t0()), 0.0);
    }

    #[test]
    fn test_score_term_is_log10_with_sign() {
        assert!((hot_score(10, t0(), t0()) - 1.0).abs() < 1e-12);
        assert!((hot_score(100, t0(), t0()) - 2.0).abs() < 1e-12);
        assert!((hot_score(-100, t0(), t0()) + 2.0).abs() < 1e-12);
        // |score| of 1 contributes nothing beyond the sign
        assert_eq!(hot_score(1, t0(), t0()), 0.0);
        assert_eq!(hot_score(-1, t0(), t0()), 0.0);
    }

    #[test]
    fn test_twelve_and_a_half_hours_costs_exactly_one() {
        let created = t0();
        let fresh = hot_score(5, created, created);
        let later = hot_score(5, created, created + Duration::minutes(750));
        assert!((fresh - later - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_increasing_in_age() {
        let created = t0();
        let mut previous = f64::INFINITY;
        for hours in [0, 1, 2, 6, 24, 24 * 7, 24 * 365] {
            let value = hot_score(42, created, created + Duration::hours(hours));
            assert!(value <= previous);
            previous = value;
        }
    }

    #[test]
    fn test_increasing_in_score_for_fixed_age() {
        let now = t0() + Duration::hours(3);
        let scores = [-1000, -10, -2, 0, 2, 10, 1000];
        let values: Vec<f64> = scores.iter().map(|s| hot_score(*s, t0(), now)).collect();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_future_creation_time_is_clamped() {
        let created = t0() + Duration::hours(1);
        assert_eq!(hot_score(10, created, t0()), hot_score(10, created, created));
    }
}
