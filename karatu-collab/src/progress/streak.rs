use chrono::NaiveDate;

/// The outcome of a server-side streak decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakDecision {
    pub streak: i32,
    /// False when the user was already active today and nothing changed
    pub changed: bool,
}

/// Decides the new streak from the stored state and today's date. The
/// client never submits a streak value, it only signals activity.
pub fn advance_streak(
    streak: i32,
    last_active_date: Option<NaiveDate>,
    today: NaiveDate,
) -> StreakDecision {
    match last_active_date {
        Some(last) if last == today => StreakDecision {
            streak,
            changed: false,
        },
        Some(last) if (today - last).num_days() == 1 => StreakDecision {
            streak: streak + 1,
            changed: true,
        },
        // A gap of more than one day, or first ever activity
        _ => StreakDecision {
            streak: 1,
            changed: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_day_is_a_no_op() {
        let decision = advance_streak(4, Some(date(2025, 3, 10)), date(2025, 3, 10));
        assert_eq!(decision.streak, 4);
        assert!(!decision.changed);
    }

    #[test]
    fn consecutive_day_increments() {
        let decision = advance_streak(4, Some(date(2025, 3, 10)), date(2025, 3, 11));
        assert_eq!(decision.streak, 5);
        assert!(decision.changed);
    }

    #[test]
    fn a_gap_resets_to_one() {
        let decision = advance_streak(14, Some(date(2025, 3, 10)), date(2025, 3, 13));
        assert_eq!(decision.streak, 1);
        assert!(decision.changed);
    }

    #[test]
    fn first_activity_starts_at_one() {
        let decision = advance_streak(0, None, date(2025, 3, 10));
        assert_eq!(decision.streak, 1);
        assert!(decision.changed);
    }
}
