//! Daily streak continuity rules.

use chrono::NaiveDate;

/// Compute the new streak value for a completion happening `today`.
///
/// `last_xp_day` is the calendar date of the user's most recent xp ledger
/// entry, or `None` when no xp has ever been earned. Dates are compared in
/// a fixed reference timezone (UTC); two instants on the same calendar day
/// collapse to a zero gap.
///
/// Rules:
/// - no prior xp entry: 0 (a first-ever completion does not open a streak)
/// - prior entry yesterday: streak + 1
/// - prior entry older than yesterday: 1 (restart, today counts)
/// - prior entry today, or in the future from clock skew: unchanged
pub fn updated_streak(last_xp_day: Option<NaiveDate>, today: NaiveDate, current: u32) -> u32 {
    let Some(last) = last_xp_day else {
        return 0;
    };
    let gap = (today - last).num_days();
    if gap == 1 {
        current + 1
    } else if gap > 1 {
        1
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_no_history_resets_to_zero() {
        assert_eq!(updated_streak(None, day("2026-01-10"), 7), 0);
    }

    #[test]
    fn test_yesterday_extends() {
        let today = day("2026-01-10");
        assert_eq!(updated_streak(Some(today - Duration::days(1)), today, 4), 5);
    }

    #[test]
    fn test_gap_restarts_at_one() {
        let today = day("2026-01-10");
        assert_eq!(updated_streak(Some(today - Duration::days(3)), today, 5), 1);
    }

    #[test]
    fn test_same_day_unchanged() {
        let today = day("2026-01-10");
        assert_eq!(updated_streak(Some(today), today, 5), 5);
    }

    #[test]
    fn test_clock_skew_unchanged() {
        let today = day("2026-01-10");
        assert_eq!(updated_streak(Some(today + Duration::days(1)), today, 5), 5);
    }
}
