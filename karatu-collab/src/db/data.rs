use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Question;

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A karatu account, along with its aggregate progress
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub email: String,
    /// The argon2 hash, never the plain text password
    pub password: String,
    /// Cumulative experience points
    pub xp: i32,
    /// Always derived from xp, never written independently
    pub level: i32,
    /// Consecutive days of qualifying activity
    pub streak: i32,
    pub last_active_date: Option<NaiveDate>,
    pub admin: bool,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    /// The user that is logged in
    pub user: UserData,
    pub expires_at: DateTime<Utc>,
}

/// A named curriculum module grouping lessons
#[derive(Debug, Clone)]
pub struct TrackData {
    pub id: PrimaryKey,
    pub name: String,
    pub description: String,
    pub language: String,
    pub icon: String,
    pub order: i32,
    pub locked: bool,
    /// The minimum user level required to unlock this track
    pub unlock_level: i32,
}

/// An ordered set of questions belonging to one track
#[derive(Debug, Clone)]
pub struct LessonData {
    pub id: PrimaryKey,
    pub track_id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    /// The fixed amount of experience granted on completion
    pub xp_reward: i32,
    pub order: i32,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// One user's mastery of one vocabulary word
#[derive(Debug, Clone)]
pub struct VocabularyData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub word: String,
    pub translation: String,
    pub example_phrase: Option<String>,
    pub strength: MemoryStrength,
    pub last_reviewed_at: DateTime<Utc>,
    pub correct_count: i32,
    pub incorrect_count: i32,
}

/// Tri-state classification of a user's mastery of one word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryStrength {
    Known,
    Fuzzy,
    Forgotten,
}

/// One user's completion state for one lesson.
/// At most one row exists per (user, lesson) pair.
#[derive(Debug, Clone)]
pub struct UserLessonData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub lesson_id: PrimaryKey,
    pub completed: bool,
    /// Count of correctly answered questions on the latest attempt
    pub score: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A static achievement catalog entry
#[derive(Debug, Clone)]
pub struct BadgeData {
    pub id: PrimaryKey,
    pub name: String,
    pub description: String,
    pub icon: String,
    /// Machine-readable criteria, e.g. "7_day_streak" or "100_xp"
    pub criteria: String,
}

/// A badge a user has earned
#[derive(Debug, Clone)]
pub struct UserBadgeData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub badge: BadgeData,
    pub earned_at: DateTime<Utc>,
}

/// A community-submitted track or lesson awaiting review
#[derive(Debug, Clone)]
pub struct ContributionData {
    pub id: PrimaryKey,
    pub contributor_id: PrimaryKey,
    pub kind: ContributionKind,
    pub status: ContributionStatus,
    /// The track a lesson contribution targets
    pub track_id: Option<PrimaryKey>,
    /// The raw payload, validated when the contribution is approved
    pub payload: serde_json::Value,
    pub reviewer_comment: Option<String>,
    pub reviewed_by: Option<PrimaryKey>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    Track,
    Lesson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    Pending,
    Approved,
    Rejected,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "Easy" => Some(Self::Easy),
            "Medium" => Some(Self::Medium),
            "Hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl MemoryStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Known => "Known",
            Self::Fuzzy => "Fuzzy",
            Self::Forgotten => "Forgotten",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "Known" => Some(Self::Known),
            "Fuzzy" => Some(Self::Fuzzy),
            "Forgotten" => Some(Self::Forgotten),
            _ => None,
        }
    }
}

impl ContributionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Lesson => "lesson",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "track" => Some(Self::Track),
            "lesson" => Some(Self::Lesson),
            _ => None,
        }
    }
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}
