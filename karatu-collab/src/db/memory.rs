use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{
    ActivityUpdate, BadgeData, CompletionUpdate, ContributionData, ContributionReview,
    ContributionStatus, Database, DatabaseError, LessonData, NewBadge, NewContribution, NewLesson,
    NewSession, NewTrack, NewUser, PrimaryKey, Result, SessionData, TrackData, UpdatedLesson,
    UpdatedTrack, UserBadgeData, UserData, UserLessonData, VocabularyChange, VocabularyData,
};

/// An in-memory database. Backs the test suites and small deployments
/// that don't want to run Postgres; single-process only.
#[derive(Default)]
pub struct MemoryDatabase {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    next_id: PrimaryKey,
    users: Vec<UserData>,
    sessions: Vec<StoredSession>,
    tracks: Vec<TrackData>,
    lessons: Vec<LessonData>,
    vocabulary: Vec<VocabularyData>,
    user_lessons: Vec<UserLessonData>,
    badges: Vec<BadgeData>,
    user_badges: Vec<StoredUserBadge>,
    contributions: Vec<ContributionData>,
}

struct StoredSession {
    id: PrimaryKey,
    token: String,
    user_id: PrimaryKey,
    expires_at: DateTime<Utc>,
}

struct StoredUserBadge {
    id: PrimaryKey,
    user_id: PrimaryKey,
    badge_id: PrimaryKey,
    earned_at: DateTime<Utc>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper to put a user at a known point in their progression
    pub async fn set_user_progress(&self, user_id: PrimaryKey, xp: i32, level: i32) {
        let mut state = self.state.write();

        if let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) {
            user.xp = xp;
            user.level = level;
        }
    }
}

impl State {
    fn next_id(&mut self) -> PrimaryKey {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, user_id: PrimaryKey) -> Result<&UserData> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    fn award_badges(&mut self, user_id: PrimaryKey, badge_ids: &[PrimaryKey]) {
        for badge_id in badge_ids {
            let already_held = self
                .user_badges
                .iter()
                .any(|ub| ub.user_id == user_id && ub.badge_id == *badge_id);

            if !already_held {
                let id = self.next_id();
                self.user_badges.push(StoredUserBadge {
                    id,
                    user_id,
                    badge_id: *badge_id,
                    earned_at: Utc::now(),
                });
            }
        }
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn check_for_admin(&self) -> Result<bool> {
        Ok(self.state.read().users.iter().any(|u| u.admin))
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.state.read().user(user_id).cloned()
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        self.state
            .read()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "username",
            })
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        self.state
            .read()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "email",
            })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut state = self.state.write();

        if state.users.iter().any(|u| u.email == new_user.email) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "email",
                value: new_user.email,
            });
        }

        if state.users.iter().any(|u| u.username == new_user.username) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "username",
                value: new_user.username,
            });
        }

        let user = UserData {
            id: state.next_id(),
            username: new_user.username,
            email: new_user.email,
            password: new_user.password,
            xp: 0,
            level: 1,
            streak: 0,
            last_active_date: None,
            admin: new_user.admin,
        };

        state.users.push(user.clone());

        Ok(user)
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<UserData>> {
        let mut users = self.state.read().users.clone();
        users.sort_by(|a, b| b.xp.cmp(&a.xp));
        users.truncate(limit as usize);

        Ok(users)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let state = self.state.read();

        let session = state
            .sessions
            .iter()
            .find(|s| s.token == token)
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        Ok(SessionData {
            id: session.id,
            token: session.token.clone(),
            user: state.user(session.user_id)?.clone(),
            expires_at: session.expires_at,
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut state = self.state.write();

        if state.sessions.iter().any(|s| s.token == new_session.token) {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "token",
                value: new_session.token,
            });
        }

        let user = state.user(new_session.user_id)?.clone();
        let id = state.next_id();

        state.sessions.push(StoredSession {
            id,
            token: new_session.token.clone(),
            user_id: new_session.user_id,
            expires_at: new_session.expires_at,
        });

        Ok(SessionData {
            id,
            token: new_session.token,
            user,
            expires_at: new_session.expires_at,
        })
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        let mut state = self.state.write();

        let index = state
            .sessions
            .iter()
            .position(|s| s.token == token)
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        state.sessions.remove(index);

        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();
        self.state.write().sessions.retain(|s| s.expires_at > now);

        Ok(())
    }

    async fn track_by_id(&self, track_id: PrimaryKey) -> Result<TrackData> {
        self.state
            .read()
            .tracks
            .iter()
            .find(|t| t.id == track_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "track",
                identifier: "id",
            })
    }

    async fn list_tracks(&self) -> Result<Vec<TrackData>> {
        let mut tracks = self.state.read().tracks.clone();
        tracks.sort_by_key(|t| t.order);

        Ok(tracks)
    }

    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData> {
        let mut state = self.state.write();

        let track = TrackData {
            id: state.next_id(),
            name: new_track.name,
            description: new_track.description,
            language: new_track.language,
            icon: new_track.icon,
            order: new_track.order,
            locked: new_track.locked,
            unlock_level: new_track.unlock_level,
        };

        state.tracks.push(track.clone());

        Ok(track)
    }

    async fn update_track(&self, updated_track: UpdatedTrack) -> Result<TrackData> {
        let mut state = self.state.write();

        let track = state
            .tracks
            .iter_mut()
            .find(|t| t.id == updated_track.id)
            .ok_or(DatabaseError::NotFound {
                resource: "track",
                identifier: "id",
            })?;

        if let Some(name) = updated_track.name {
            track.name = name;
        }
        if let Some(description) = updated_track.description {
            track.description = description;
        }
        if let Some(icon) = updated_track.icon {
            track.icon = icon;
        }
        if let Some(locked) = updated_track.locked {
            track.locked = locked;
        }
        if let Some(unlock_level) = updated_track.unlock_level {
            track.unlock_level = unlock_level;
        }

        Ok(track.clone())
    }

    async fn lesson_by_id(&self, lesson_id: PrimaryKey) -> Result<LessonData> {
        self.state
            .read()
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "lesson",
                identifier: "id",
            })
    }

    async fn lessons_by_track(&self, track_id: PrimaryKey) -> Result<Vec<LessonData>> {
        let mut lessons: Vec<_> = self
            .state
            .read()
            .lessons
            .iter()
            .filter(|l| l.track_id == track_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.order);

        Ok(lessons)
    }

    async fn create_lesson(&self, new_lesson: NewLesson) -> Result<LessonData> {
        let mut state = self.state.write();

        if !state.tracks.iter().any(|t| t.id == new_lesson.track_id) {
            return Err(DatabaseError::NotFound {
                resource: "track",
                identifier: "id",
            });
        }

        let lesson = LessonData {
            id: state.next_id(),
            track_id: new_lesson.track_id,
            title: new_lesson.title,
            description: new_lesson.description,
            difficulty: new_lesson.difficulty,
            xp_reward: new_lesson.xp_reward,
            order: new_lesson.order,
            questions: new_lesson.questions,
        };

        state.lessons.push(lesson.clone());

        Ok(lesson)
    }

    async fn update_lesson(&self, updated_lesson: UpdatedLesson) -> Result<LessonData> {
        let mut state = self.state.write();

        let lesson = state
            .lessons
            .iter_mut()
            .find(|l| l.id == updated_lesson.id)
            .ok_or(DatabaseError::NotFound {
                resource: "lesson",
                identifier: "id",
            })?;

        if let Some(title) = updated_lesson.title {
            lesson.title = title;
        }
        if let Some(description) = updated_lesson.description {
            lesson.description = description;
        }
        if let Some(difficulty) = updated_lesson.difficulty {
            lesson.difficulty = difficulty;
        }
        if let Some(xp_reward) = updated_lesson.xp_reward {
            lesson.xp_reward = xp_reward;
        }
        if let Some(questions) = updated_lesson.questions {
            lesson.questions = questions;
        }

        Ok(lesson.clone())
    }

    async fn vocabulary_by_word(
        &self,
        user_id: PrimaryKey,
        word: &str,
    ) -> Result<VocabularyData> {
        self.state
            .read()
            .vocabulary
            .iter()
            .find(|v| v.user_id == user_id && v.word == word)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "vocabulary",
                identifier: "user_id:word",
            })
    }

    async fn list_vocabulary(&self, user_id: PrimaryKey) -> Result<Vec<VocabularyData>> {
        Ok(self
            .state
            .read()
            .vocabulary
            .iter()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn user_lesson(
        &self,
        user_id: PrimaryKey,
        lesson_id: PrimaryKey,
    ) -> Result<UserLessonData> {
        self.state
            .read()
            .user_lessons
            .iter()
            .find(|ul| ul.user_id == user_id && ul.lesson_id == lesson_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user lesson",
                identifier: "user_id:lesson_id",
            })
    }

    async fn list_user_lessons(&self, user_id: PrimaryKey) -> Result<Vec<UserLessonData>> {
        Ok(self
            .state
            .read()
            .user_lessons
            .iter()
            .filter(|ul| ul.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn completed_lesson_count(&self, user_id: PrimaryKey) -> Result<i64> {
        Ok(self
            .state
            .read()
            .user_lessons
            .iter()
            .filter(|ul| ul.user_id == user_id && ul.completed)
            .count() as i64)
    }

    async fn list_badges(&self) -> Result<Vec<BadgeData>> {
        Ok(self.state.read().badges.clone())
    }

    async fn create_badge(&self, new_badge: NewBadge) -> Result<BadgeData> {
        let mut state = self.state.write();

        let badge = BadgeData {
            id: state.next_id(),
            name: new_badge.name,
            description: new_badge.description,
            icon: new_badge.icon,
            criteria: new_badge.criteria,
        };

        state.badges.push(badge.clone());

        Ok(badge)
    }

    async fn user_badges(&self, user_id: PrimaryKey) -> Result<Vec<UserBadgeData>> {
        let state = self.state.read();

        let earned = state
            .user_badges
            .iter()
            .filter(|ub| ub.user_id == user_id)
            .filter_map(|ub| {
                state
                    .badges
                    .iter()
                    .find(|b| b.id == ub.badge_id)
                    .map(|badge| UserBadgeData {
                        id: ub.id,
                        user_id: ub.user_id,
                        badge: badge.clone(),
                        earned_at: ub.earned_at,
                    })
            })
            .collect();

        Ok(earned)
    }

    async fn contribution_by_id(&self, contribution_id: PrimaryKey) -> Result<ContributionData> {
        self.state
            .read()
            .contributions
            .iter()
            .find(|c| c.id == contribution_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "contribution",
                identifier: "id",
            })
    }

    async fn list_contributions(
        &self,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<ContributionData>> {
        let mut contributions: Vec<_> = self
            .state
            .read()
            .contributions
            .iter()
            .filter(|c| status.map(|s| c.status == s).unwrap_or(true))
            .cloned()
            .collect();
        contributions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(contributions)
    }

    async fn create_contribution(
        &self,
        new_contribution: NewContribution,
    ) -> Result<ContributionData> {
        let mut state = self.state.write();

        let contribution = ContributionData {
            id: state.next_id(),
            contributor_id: new_contribution.contributor_id,
            kind: new_contribution.kind,
            status: ContributionStatus::Pending,
            track_id: new_contribution.track_id,
            payload: new_contribution.payload,
            reviewer_comment: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };

        state.contributions.push(contribution.clone());

        Ok(contribution)
    }

    async fn review_contribution(&self, review: ContributionReview) -> Result<ContributionData> {
        let mut state = self.state.write();

        let contribution = state
            .contributions
            .iter_mut()
            .find(|c| c.id == review.id)
            .ok_or(DatabaseError::NotFound {
                resource: "contribution",
                identifier: "id",
            })?;

        contribution.status = review.status;
        contribution.reviewer_comment = review.reviewer_comment;
        contribution.reviewed_by = Some(review.reviewed_by);
        contribution.reviewed_at = Some(review.reviewed_at);

        Ok(contribution.clone())
    }

    async fn apply_completion(
        &self,
        update: CompletionUpdate,
    ) -> Result<(UserData, UserLessonData)> {
        // The whole update happens under one write lock, mirroring the
        // transactional behavior of the Postgres backend
        let mut state = self.state.write();

        state.user(update.user_id)?;

        let user_lesson = match state
            .user_lessons
            .iter_mut()
            .find(|ul| ul.user_id == update.user_id && ul.lesson_id == update.lesson_id)
        {
            Some(existing) => {
                existing.completed = true;
                existing.score = update.score;
                existing.completed_at = Some(update.completed_at);
                existing.clone()
            }
            None => {
                let user_lesson = UserLessonData {
                    id: state.next_id(),
                    user_id: update.user_id,
                    lesson_id: update.lesson_id,
                    completed: true,
                    score: update.score,
                    completed_at: Some(update.completed_at),
                };
                state.user_lessons.push(user_lesson.clone());
                user_lesson
            }
        };

        for change in update.vocabulary {
            match change {
                VocabularyChange::Create {
                    word,
                    translation,
                    example_phrase,
                    strength,
                    correct_count,
                    incorrect_count,
                } => {
                    let vocabulary = VocabularyData {
                        id: state.next_id(),
                        user_id: update.user_id,
                        word,
                        translation,
                        example_phrase,
                        strength,
                        last_reviewed_at: update.completed_at,
                        correct_count,
                        incorrect_count,
                    };
                    state.vocabulary.push(vocabulary);
                }
                VocabularyChange::Update {
                    id,
                    strength,
                    correct_count,
                    incorrect_count,
                } => {
                    if let Some(row) = state.vocabulary.iter_mut().find(|v| v.id == id) {
                        row.strength = strength;
                        row.correct_count = correct_count;
                        row.incorrect_count = incorrect_count;
                        row.last_reviewed_at = update.completed_at;
                    }
                }
            }
        }

        state.award_badges(update.user_id, &update.awarded_badges);

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == update.user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        user.xp = update.xp;
        user.level = update.level;
        user.streak = update.streak;
        user.last_active_date = Some(update.last_active_date);

        Ok((user.clone(), user_lesson))
    }

    async fn apply_activity(&self, update: ActivityUpdate) -> Result<UserData> {
        let mut state = self.state.write();

        state.award_badges(update.user_id, &update.awarded_badges);

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == update.user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        user.streak = update.streak;
        user.last_active_date = Some(update.last_active_date);

        Ok(user.clone())
    }
}
