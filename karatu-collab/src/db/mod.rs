use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

use crate::catalog::Question;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and persist karatu data
#[async_trait]
pub trait Database: Send + Sync {
    async fn check_for_admin(&self) -> Result<bool>;
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    /// Users ordered by xp descending
    async fn leaderboard(&self, limit: i64) -> Result<Vec<UserData>>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn track_by_id(&self, track_id: PrimaryKey) -> Result<TrackData>;
    /// All tracks in display order
    async fn list_tracks(&self) -> Result<Vec<TrackData>>;
    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData>;
    async fn update_track(&self, updated_track: UpdatedTrack) -> Result<TrackData>;

    async fn lesson_by_id(&self, lesson_id: PrimaryKey) -> Result<LessonData>;
    /// Lessons of one track in display order
    async fn lessons_by_track(&self, track_id: PrimaryKey) -> Result<Vec<LessonData>>;
    async fn create_lesson(&self, new_lesson: NewLesson) -> Result<LessonData>;
    async fn update_lesson(&self, updated_lesson: UpdatedLesson) -> Result<LessonData>;

    async fn vocabulary_by_word(&self, user_id: PrimaryKey, word: &str)
        -> Result<VocabularyData>;
    async fn list_vocabulary(&self, user_id: PrimaryKey) -> Result<Vec<VocabularyData>>;

    async fn user_lesson(
        &self,
        user_id: PrimaryKey,
        lesson_id: PrimaryKey,
    ) -> Result<UserLessonData>;
    async fn list_user_lessons(&self, user_id: PrimaryKey) -> Result<Vec<UserLessonData>>;
    async fn completed_lesson_count(&self, user_id: PrimaryKey) -> Result<i64>;

    async fn list_badges(&self) -> Result<Vec<BadgeData>>;
    async fn create_badge(&self, new_badge: NewBadge) -> Result<BadgeData>;
    async fn user_badges(&self, user_id: PrimaryKey) -> Result<Vec<UserBadgeData>>;

    async fn contribution_by_id(&self, contribution_id: PrimaryKey) -> Result<ContributionData>;
    /// Contributions newest first, optionally filtered by status
    async fn list_contributions(
        &self,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<ContributionData>>;
    async fn create_contribution(
        &self,
        new_contribution: NewContribution,
    ) -> Result<ContributionData>;
    async fn review_contribution(&self, review: ContributionReview) -> Result<ContributionData>;

    /// Applies every effect of one lesson completion as a single atomic unit,
    /// serialized per user. Either all of it is persisted or none of it.
    async fn apply_completion(
        &self,
        update: CompletionUpdate,
    ) -> Result<(UserData, UserLessonData)>;

    /// Applies a streak change and any badges it unlocked, atomically.
    async fn apply_activity(&self, update: ActivityUpdate) -> Result<UserData>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub admin: bool,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewTrack {
    pub name: String,
    pub description: String,
    pub language: String,
    pub icon: String,
    pub order: i32,
    pub locked: bool,
    pub unlock_level: i32,
}

#[derive(Debug)]
pub struct UpdatedTrack {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub locked: Option<bool>,
    pub unlock_level: Option<i32>,
}

#[derive(Debug)]
pub struct NewLesson {
    pub track_id: PrimaryKey,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub xp_reward: i32,
    pub order: i32,
    pub questions: Vec<Question>,
}

#[derive(Debug)]
pub struct UpdatedLesson {
    pub id: PrimaryKey,
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub xp_reward: Option<i32>,
    pub questions: Option<Vec<Question>>,
}

#[derive(Debug)]
pub struct NewBadge {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub criteria: String,
}

#[derive(Debug)]
pub struct NewContribution {
    pub contributor_id: PrimaryKey,
    pub kind: ContributionKind,
    pub track_id: Option<PrimaryKey>,
    pub payload: serde_json::Value,
}

#[derive(Debug)]
pub struct ContributionReview {
    pub id: PrimaryKey,
    pub status: ContributionStatus,
    pub reviewer_comment: Option<String>,
    pub reviewed_by: PrimaryKey,
    pub reviewed_at: DateTime<Utc>,
}

/// A vocabulary row as it should look after a completion is applied
#[derive(Debug, Clone)]
pub enum VocabularyChange {
    Create {
        word: String,
        translation: String,
        example_phrase: Option<String>,
        strength: MemoryStrength,
        correct_count: i32,
        incorrect_count: i32,
    },
    Update {
        id: PrimaryKey,
        strength: MemoryStrength,
        correct_count: i32,
        incorrect_count: i32,
    },
}

/// Every computed effect of one lesson completion
#[derive(Debug)]
pub struct CompletionUpdate {
    pub user_id: PrimaryKey,
    pub lesson_id: PrimaryKey,
    pub score: i32,
    pub completed_at: DateTime<Utc>,
    /// New cumulative totals, already derived from each other
    pub xp: i32,
    pub level: i32,
    pub streak: i32,
    pub last_active_date: NaiveDate,
    pub vocabulary: Vec<VocabularyChange>,
    /// Badges that became newly earned by this completion
    pub awarded_badges: Vec<PrimaryKey>,
}

/// A streak update from an activity signal
#[derive(Debug)]
pub struct ActivityUpdate {
    pub user_id: PrimaryKey,
    pub streak: i32,
    pub last_active_date: NaiveDate,
    pub awarded_badges: Vec<PrimaryKey>,
}
