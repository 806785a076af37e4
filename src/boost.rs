//! Boost resolver.

use chrono::{DateTime, Utc};

use crate::models::Boost;

/// Effective XP multiplier at the instant `now`.
///
/// Returns the stored multiplier only while the boost is strictly
/// unexpired; an absent or expired boost contributes nothing. A non-finite
/// stored multiplier degrades to 1.0. Side-effect free: expired state is
/// cleared by a separate maintenance path, never here.
pub fn effective_multiplier(boost: Option<&Boost>, now: DateTime<Utc>) -> f64 {
    match boost {
        Some(b) if b.expires_at > now && b.multiplier.is_finite() => b.multiplier,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_active_boost_applies() {
        let boost = Boost {
            multiplier: 2.0,
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert_eq!(effective_multiplier(Some(&boost), Utc::now()), 2.0);
    }

    #[test]
    fn test_expired_boost_is_inert() {
        let boost = Boost {
            multiplier: 2.0,
            expires_at: Utc::now() - Duration::hours(1),
        };
        assert_eq!(effective_multiplier(Some(&boost), Utc::now()), 1.0);
    }

    #[test]
    fn test_no_boost() {
        assert_eq!(effective_multiplier(None, Utc::now()), 1.0);
    }

    #[test]
    fn test_non_finite_multiplier_degrades() {
        let boost = Boost {
            multiplier: f64::NAN,
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert_eq!(effective_multiplier(Some(&boost), Utc::now()), 1.0);
    }
}
