//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use chrono::{DateTime, NaiveDate, Utc};
use karatu_collab::{
    BadgeData, ContributionData, LessonData, Question, SessionData, TrackData, UserBadgeData,
    UserData, UserLessonData, VocabularyData,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    username: String,
    email: String,
    xp: i32,
    level: i32,
    streak: i32,
    last_active_date: Option<NaiveDate>,
    admin: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    id: i32,
    name: String,
    description: String,
    language: String,
    icon: String,
    order: i32,
    locked: bool,
    unlock_level: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    id: i32,
    track_id: i32,
    title: String,
    description: String,
    difficulty: String,
    xp_reward: i32,
    order: i32,
    #[schema(value_type = Vec<Object>)]
    questions: Vec<Question>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vocabulary {
    id: i32,
    word: String,
    translation: String,
    example_phrase: Option<String>,
    strength: String,
    last_reviewed_at: DateTime<Utc>,
    correct_count: i32,
    incorrect_count: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserLesson {
    id: i32,
    user_id: i32,
    lesson_id: i32,
    completed: bool,
    score: i32,
    completed_at: Option<DateTime<Utc>>,
}

/// The combined result of a lesson completion
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub user_lesson: UserLesson,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    id: i32,
    name: String,
    description: String,
    icon: String,
    criteria: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadge {
    id: i32,
    badge: Badge,
    earned_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    id: i32,
    contributor_id: i32,
    kind: String,
    status: String,
    track_id: Option<i32>,
    #[schema(value_type = Object)]
    payload: serde_json::Value,
    reviewer_comment: Option<String>,
    reviewed_by: Option<i32>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            xp: self.xp,
            level: self.level,
            streak: self.streak,
            last_active_date: self.last_active_date,
            admin: self.admin,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Track> for TrackData {
    fn to_serialized(&self) -> Track {
        Track {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            language: self.language.clone(),
            icon: self.icon.clone(),
            order: self.order,
            locked: self.locked,
            unlock_level: self.unlock_level,
        }
    }
}

impl ToSerialized<Lesson> for LessonData {
    fn to_serialized(&self) -> Lesson {
        Lesson {
            id: self.id,
            track_id: self.track_id,
            title: self.title.clone(),
            description: self.description.clone(),
            difficulty: self.difficulty.as_str().to_string(),
            xp_reward: self.xp_reward,
            order: self.order,
            questions: self.questions.clone(),
        }
    }
}

impl ToSerialized<Vocabulary> for VocabularyData {
    fn to_serialized(&self) -> Vocabulary {
        Vocabulary {
            id: self.id,
            word: self.word.clone(),
            translation: self.translation.clone(),
            example_phrase: self.example_phrase.clone(),
            strength: self.strength.as_str().to_string(),
            last_reviewed_at: self.last_reviewed_at,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
        }
    }
}

impl ToSerialized<UserLesson> for UserLessonData {
    fn to_serialized(&self) -> UserLesson {
        UserLesson {
            id: self.id,
            user_id: self.user_id,
            lesson_id: self.lesson_id,
            completed: self.completed,
            score: self.score,
            completed_at: self.completed_at,
        }
    }
}

impl ToSerialized<Badge> for BadgeData {
    fn to_serialized(&self) -> Badge {
        Badge {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            criteria: self.criteria.clone(),
        }
    }
}

impl ToSerialized<EarnedBadge> for UserBadgeData {
    fn to_serialized(&self) -> EarnedBadge {
        EarnedBadge {
            id: self.id,
            badge: self.badge.to_serialized(),
            earned_at: self.earned_at,
        }
    }
}

impl ToSerialized<Contribution> for ContributionData {
    fn to_serialized(&self) -> Contribution {
        Contribution {
            id: self.id,
            contributor_id: self.contributor_id,
            kind: self.kind.as_str().to_string(),
            status: self.status.as_str().to_string(),
            track_id: self.track_id,
            payload: self.payload.clone(),
            reviewer_comment: self.reviewer_comment.clone(),
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at,
            created_at: self.created_at,
        }
    }
}
