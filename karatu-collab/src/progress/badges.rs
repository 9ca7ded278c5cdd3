use log::warn;

/// A parsed badge criteria string from the badge catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCriteria {
    /// "<n>_xp", met once cumulative xp reaches n
    Xp(i32),
    /// "<n>_day_streak", met once the streak reaches n days
    StreakDays(i32),
    /// "complete_first_lesson", met once any lesson is completed
    FirstLesson,
}

/// The cumulative stats a criteria is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    pub xp: i32,
    pub streak: i32,
    pub completed_lessons: i64,
}

impl BadgeCriteria {
    /// Parses a catalog criteria string. Unknown strings parse to `None`
    /// and never match, so a typo in the catalog can't award anything.
    pub fn parse(criteria: &str) -> Option<Self> {
        if criteria == "complete_first_lesson" {
            return Some(Self::FirstLesson);
        }

        if let Some(days) = criteria.strip_suffix("_day_streak") {
            return days.parse().ok().map(Self::StreakDays);
        }

        if let Some(xp) = criteria.strip_suffix("_xp") {
            return xp.parse().ok().map(Self::Xp);
        }

        None
    }

    pub fn is_met(&self, snapshot: &ProgressSnapshot) -> bool {
        match self {
            Self::Xp(required) => snapshot.xp >= *required,
            Self::StreakDays(required) => snapshot.streak >= *required,
            Self::FirstLesson => snapshot.completed_lessons >= 1,
        }
    }
}

/// Parse-and-test in one step, warning once per unparseable criteria
pub fn criteria_met(criteria: &str, snapshot: &ProgressSnapshot) -> bool {
    match BadgeCriteria::parse(criteria) {
        Some(parsed) => parsed.is_met(snapshot),
        None => {
            warn!("Unknown badge criteria: {}", criteria);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: ProgressSnapshot = ProgressSnapshot {
        xp: 120,
        streak: 7,
        completed_lessons: 1,
    };

    #[test]
    fn parses_the_catalog_criteria_forms() {
        assert_eq!(BadgeCriteria::parse("100_xp"), Some(BadgeCriteria::Xp(100)));
        assert_eq!(
            BadgeCriteria::parse("7_day_streak"),
            Some(BadgeCriteria::StreakDays(7))
        );
        assert_eq!(
            BadgeCriteria::parse("complete_first_lesson"),
            Some(BadgeCriteria::FirstLesson)
        );
        assert_eq!(BadgeCriteria::parse("polyglot"), None);
        assert_eq!(BadgeCriteria::parse("many_xp"), None);
    }

    #[test]
    fn criteria_compare_against_the_snapshot() {
        assert!(criteria_met("100_xp", &SNAPSHOT));
        assert!(!criteria_met("500_xp", &SNAPSHOT));
        assert!(criteria_met("7_day_streak", &SNAPSHOT));
        assert!(!criteria_met("30_day_streak", &SNAPSHOT));
        assert!(criteria_met("complete_first_lesson", &SNAPSHOT));
    }

    #[test]
    fn unknown_criteria_never_match() {
        assert!(!criteria_met("left_handed_speedrun", &SNAPSHOT));
    }
}
