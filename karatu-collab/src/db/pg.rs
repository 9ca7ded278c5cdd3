use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, Error as SqlxError, PgPool};

use crate::{
    catalog::Question, ActivityUpdate, BadgeData, CompletionUpdate, ContributionData,
    ContributionKind, ContributionReview, ContributionStatus, Database, DatabaseError,
    DatabaseResult, Difficulty, IntoDatabaseError, LessonData, MemoryStrength, NewBadge,
    NewContribution, NewLesson, NewSession, NewTrack, NewUser, PrimaryKey, Result, SessionData,
    TrackData, UpdatedLesson, UpdatedTrack, UserBadgeData, UserData, UserLessonData,
    VocabularyChange, VocabularyData,
};

/// A postgres database implementation for karatu
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: PrimaryKey,
    username: String,
    email: String,
    password: String,
    xp: i32,
    level: i32,
    streak: i32,
    last_active_date: Option<NaiveDate>,
    admin: bool,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    expires_at: DateTime<Utc>,
    user_id: PrimaryKey,
    username: String,
    email: String,
    password: String,
    xp: i32,
    level: i32,
    streak: i32,
    last_active_date: Option<NaiveDate>,
    admin: bool,
}

#[derive(sqlx::FromRow)]
struct TrackRow {
    id: PrimaryKey,
    name: String,
    description: String,
    language: String,
    icon: String,
    order: i32,
    locked: bool,
    unlock_level: i32,
}

#[derive(sqlx::FromRow)]
struct LessonRow {
    id: PrimaryKey,
    track_id: PrimaryKey,
    title: String,
    description: String,
    difficulty: String,
    xp_reward: i32,
    order: i32,
    questions: Json<Vec<Question>>,
}

#[derive(sqlx::FromRow)]
struct VocabularyRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    word: String,
    translation: String,
    example_phrase: Option<String>,
    strength: String,
    last_reviewed_at: DateTime<Utc>,
    correct_count: i32,
    incorrect_count: i32,
}

#[derive(sqlx::FromRow)]
struct UserLessonRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    lesson_id: PrimaryKey,
    completed: bool,
    score: i32,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct BadgeRow {
    id: PrimaryKey,
    name: String,
    description: String,
    icon: String,
    criteria: String,
}

#[derive(sqlx::FromRow)]
struct UserBadgeRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    earned_at: DateTime<Utc>,
    badge_id: PrimaryKey,
    name: String,
    description: String,
    icon: String,
    criteria: String,
}

#[derive(sqlx::FromRow)]
struct ContributionRow {
    id: PrimaryKey,
    contributor_id: PrimaryKey,
    kind: String,
    status: String,
    track_id: Option<PrimaryKey>,
    payload: Json<serde_json::Value>,
    reviewer_comment: Option<String>,
    reviewed_by: Option<PrimaryKey>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

fn bad_column(column: &str, value: &str) -> DatabaseError {
    DatabaseError::Internal(format!("unexpected {} value: {}", column, value).into())
}

impl From<UserRow> for UserData {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password: row.password,
            xp: row.xp,
            level: row.level,
            streak: row.streak,
            last_active_date: row.last_active_date,
            admin: row.admin,
        }
    }
}

impl SessionRow {
    fn into_data(self) -> SessionData {
        SessionData {
            id: self.id,
            token: self.token,
            expires_at: self.expires_at,
            user: UserData {
                id: self.user_id,
                username: self.username,
                email: self.email,
                password: self.password,
                xp: self.xp,
                level: self.level,
                streak: self.streak,
                last_active_date: self.last_active_date,
                admin: self.admin,
            },
        }
    }
}

impl From<TrackRow> for TrackData {
    fn from(row: TrackRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            language: row.language,
            icon: row.icon,
            order: row.order,
            locked: row.locked,
            unlock_level: row.unlock_level,
        }
    }
}

impl LessonRow {
    fn into_data(self) -> Result<LessonData> {
        let difficulty = Difficulty::from_str(&self.difficulty)
            .ok_or_else(|| bad_column("difficulty", &self.difficulty))?;

        Ok(LessonData {
            id: self.id,
            track_id: self.track_id,
            title: self.title,
            description: self.description,
            difficulty,
            xp_reward: self.xp_reward,
            order: self.order,
            questions: self.questions.0,
        })
    }
}

impl VocabularyRow {
    fn into_data(self) -> Result<VocabularyData> {
        let strength = MemoryStrength::from_str(&self.strength)
            .ok_or_else(|| bad_column("strength", &self.strength))?;

        Ok(VocabularyData {
            id: self.id,
            user_id: self.user_id,
            word: self.word,
            translation: self.translation,
            example_phrase: self.example_phrase,
            strength,
            last_reviewed_at: self.last_reviewed_at,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
        })
    }
}

impl From<UserLessonRow> for UserLessonData {
    fn from(row: UserLessonRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            lesson_id: row.lesson_id,
            completed: row.completed,
            score: row.score,
            completed_at: row.completed_at,
        }
    }
}

impl From<BadgeRow> for BadgeData {
    fn from(row: BadgeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            icon: row.icon,
            criteria: row.criteria,
        }
    }
}

impl From<UserBadgeRow> for UserBadgeData {
    fn from(row: UserBadgeRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            earned_at: row.earned_at,
            badge: BadgeData {
                id: row.badge_id,
                name: row.name,
                description: row.description,
                icon: row.icon,
                criteria: row.criteria,
            },
        }
    }
}

impl ContributionRow {
    fn into_data(self) -> Result<ContributionData> {
        let kind =
            ContributionKind::from_str(&self.kind).ok_or_else(|| bad_column("kind", &self.kind))?;
        let status = ContributionStatus::from_str(&self.status)
            .ok_or_else(|| bad_column("status", &self.status))?;

        Ok(ContributionData {
            id: self.id,
            contributor_id: self.contributor_id,
            kind,
            status,
            track_id: self.track_id,
            payload: self.payload.0,
            reviewer_comment: self.reviewer_comment,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at,
            created_at: self.created_at,
        })
    }
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn check_for_admin(&self) -> Result<bool> {
        let result = sqlx::query("SELECT id FROM users WHERE admin = true")
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => match e {
                SqlxError::RowNotFound => Ok(false),
                e => Err(e.any()),
            },
        }
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "username"))
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "email"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;
        self.user_by_username(&new_user.username)
            .await
            .conflict_or_ok("user", "username", &new_user.username)?;

        sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, email, password, admin) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(new_user.admin)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<UserData>> {
        let rows =
            sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY xp DESC LIMIT $1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT
                sessions.id,
                sessions.token,
                sessions.expires_at,
                users.id AS user_id,
                users.username,
                users.email,
                users.password,
                users.xp,
                users.level,
                users.streak,
                users.last_active_date,
                users.admin
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = $1",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map(SessionRow::into_data)
        .map_err(|e| e.not_found_or("session", "token"))
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&new_session.token)
            .bind(new_session.user_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE timezone('UTC', now()) > expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn track_by_id(&self, track_id: PrimaryKey) -> Result<TrackData> {
        sqlx::query_as::<_, TrackRow>("SELECT * FROM tracks WHERE id = $1")
            .bind(track_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("track", "id"))
    }

    async fn list_tracks(&self) -> Result<Vec<TrackData>> {
        let rows = sqlx::query_as::<_, TrackRow>("SELECT * FROM tracks ORDER BY \"order\"")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_track(&self, new_track: NewTrack) -> Result<TrackData> {
        sqlx::query_as::<_, TrackRow>(
            "INSERT INTO tracks (name, description, language, icon, \"order\", locked, unlock_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *",
        )
        .bind(&new_track.name)
        .bind(&new_track.description)
        .bind(&new_track.language)
        .bind(&new_track.icon)
        .bind(new_track.order)
        .bind(new_track.locked)
        .bind(new_track.unlock_level)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_track(&self, updated_track: UpdatedTrack) -> Result<TrackData> {
        let track = self.track_by_id(updated_track.id).await?;

        sqlx::query(
            "UPDATE tracks SET
                name = $1,
                description = $2,
                icon = $3,
                locked = $4,
                unlock_level = $5
            WHERE id = $6",
        )
        .bind(updated_track.name.unwrap_or(track.name))
        .bind(updated_track.description.unwrap_or(track.description))
        .bind(updated_track.icon.unwrap_or(track.icon))
        .bind(updated_track.locked.unwrap_or(track.locked))
        .bind(updated_track.unlock_level.unwrap_or(track.unlock_level))
        .bind(updated_track.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.track_by_id(updated_track.id).await
    }

    async fn lesson_by_id(&self, lesson_id: PrimaryKey) -> Result<LessonData> {
        sqlx::query_as::<_, LessonRow>("SELECT * FROM lessons WHERE id = $1")
            .bind(lesson_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("lesson", "id"))?
            .into_data()
    }

    async fn lessons_by_track(&self, track_id: PrimaryKey) -> Result<Vec<LessonData>> {
        let rows = sqlx::query_as::<_, LessonRow>(
            "SELECT * FROM lessons WHERE track_id = $1 ORDER BY \"order\"",
        )
        .bind(track_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.into_iter().map(LessonRow::into_data).collect()
    }

    async fn create_lesson(&self, new_lesson: NewLesson) -> Result<LessonData> {
        // The target track must exist
        let _ = self.track_by_id(new_lesson.track_id).await?;

        sqlx::query_as::<_, LessonRow>(
            "INSERT INTO lessons (track_id, title, description, difficulty, xp_reward, \"order\", questions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *",
        )
        .bind(new_lesson.track_id)
        .bind(&new_lesson.title)
        .bind(&new_lesson.description)
        .bind(new_lesson.difficulty.as_str())
        .bind(new_lesson.xp_reward)
        .bind(new_lesson.order)
        .bind(Json(&new_lesson.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_data()
    }

    async fn update_lesson(&self, updated_lesson: UpdatedLesson) -> Result<LessonData> {
        let lesson = self.lesson_by_id(updated_lesson.id).await?;

        sqlx::query(
            "UPDATE lessons SET
                title = $1,
                description = $2,
                difficulty = $3,
                xp_reward = $4,
                questions = $5
            WHERE id = $6",
        )
        .bind(updated_lesson.title.unwrap_or(lesson.title))
        .bind(updated_lesson.description.unwrap_or(lesson.description))
        .bind(
            updated_lesson
                .difficulty
                .unwrap_or(lesson.difficulty)
                .as_str(),
        )
        .bind(updated_lesson.xp_reward.unwrap_or(lesson.xp_reward))
        .bind(Json(updated_lesson.questions.unwrap_or(lesson.questions)))
        .bind(updated_lesson.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.lesson_by_id(updated_lesson.id).await
    }

    async fn vocabulary_by_word(
        &self,
        user_id: PrimaryKey,
        word: &str,
    ) -> Result<VocabularyData> {
        sqlx::query_as::<_, VocabularyRow>(
            "SELECT * FROM vocabulary WHERE user_id = $1 AND word = $2",
        )
        .bind(user_id)
        .bind(word)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("vocabulary", "user_id:word"))?
        .into_data()
    }

    async fn list_vocabulary(&self, user_id: PrimaryKey) -> Result<Vec<VocabularyData>> {
        let rows = sqlx::query_as::<_, VocabularyRow>(
            "SELECT * FROM vocabulary WHERE user_id = $1 ORDER BY last_reviewed_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.into_iter().map(VocabularyRow::into_data).collect()
    }

    async fn user_lesson(
        &self,
        user_id: PrimaryKey,
        lesson_id: PrimaryKey,
    ) -> Result<UserLessonData> {
        sqlx::query_as::<_, UserLessonRow>(
            "SELECT * FROM user_lessons WHERE user_id = $1 AND lesson_id = $2",
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("user lesson", "user_id:lesson_id"))
    }

    async fn list_user_lessons(&self, user_id: PrimaryKey) -> Result<Vec<UserLessonData>> {
        let rows = sqlx::query_as::<_, UserLessonRow>(
            "SELECT * FROM user_lessons WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn completed_lesson_count(&self, user_id: PrimaryKey) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM user_lessons WHERE user_id = $1 AND completed = true",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(count.0)
    }

    async fn list_badges(&self) -> Result<Vec<BadgeData>> {
        let rows = sqlx::query_as::<_, BadgeRow>("SELECT * FROM badges")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_badge(&self, new_badge: NewBadge) -> Result<BadgeData> {
        sqlx::query_as::<_, BadgeRow>(
            "INSERT INTO badges (name, description, icon, criteria)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(&new_badge.name)
        .bind(&new_badge.description)
        .bind(&new_badge.icon)
        .bind(&new_badge.criteria)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn user_badges(&self, user_id: PrimaryKey) -> Result<Vec<UserBadgeData>> {
        let rows = sqlx::query_as::<_, UserBadgeRow>(
            "SELECT
                user_badges.id,
                user_badges.user_id,
                user_badges.earned_at,
                badges.id AS badge_id,
                badges.name,
                badges.description,
                badges.icon,
                badges.criteria
            FROM user_badges
                INNER JOIN badges ON user_badges.badge_id = badges.id
            WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn contribution_by_id(&self, contribution_id: PrimaryKey) -> Result<ContributionData> {
        sqlx::query_as::<_, ContributionRow>("SELECT * FROM contributions WHERE id = $1")
            .bind(contribution_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("contribution", "id"))?
            .into_data()
    }

    async fn list_contributions(
        &self,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<ContributionData>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, ContributionRow>(
                    "SELECT * FROM contributions WHERE status = $1 ORDER BY created_at DESC",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ContributionRow>(
                    "SELECT * FROM contributions ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| e.any())?;

        rows.into_iter().map(ContributionRow::into_data).collect()
    }

    async fn create_contribution(
        &self,
        new_contribution: NewContribution,
    ) -> Result<ContributionData> {
        sqlx::query_as::<_, ContributionRow>(
            "INSERT INTO contributions (contributor_id, kind, track_id, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(new_contribution.contributor_id)
        .bind(new_contribution.kind.as_str())
        .bind(new_contribution.track_id)
        .bind(Json(&new_contribution.payload))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_data()
    }

    async fn review_contribution(&self, review: ContributionReview) -> Result<ContributionData> {
        sqlx::query_as::<_, ContributionRow>(
            "UPDATE contributions SET
                status = $1,
                reviewer_comment = $2,
                reviewed_by = $3,
                reviewed_at = $4
            WHERE id = $5
            RETURNING *",
        )
        .bind(review.status.as_str())
        .bind(&review.reviewer_comment)
        .bind(review.reviewed_by)
        .bind(review.reviewed_at)
        .bind(review.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("contribution", "id"))?
        .into_data()
    }

    async fn apply_completion(
        &self,
        update: CompletionUpdate,
    ) -> Result<(UserData, UserLessonData)> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        // Serialize concurrent completions for the same user behind a row
        // lock, so xp can't be double-applied by racing requests
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(update.user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?;

        let user_lesson: UserLessonData = sqlx::query_as::<_, UserLessonRow>(
            "INSERT INTO user_lessons (user_id, lesson_id, completed, score, completed_at)
            VALUES ($1, $2, true, $3, $4)
            ON CONFLICT (user_id, lesson_id)
            DO UPDATE SET completed = true, score = EXCLUDED.score, completed_at = EXCLUDED.completed_at
            RETURNING *",
        )
        .bind(update.user_id)
        .bind(update.lesson_id)
        .bind(update.score)
        .bind(update.completed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?
        .into();

        for change in &update.vocabulary {
            match change {
                VocabularyChange::Create {
                    word,
                    translation,
                    example_phrase,
                    strength,
                    correct_count,
                    incorrect_count,
                } => {
                    sqlx::query(
                        "INSERT INTO vocabulary
                            (user_id, word, translation, example_phrase, strength,
                             last_reviewed_at, correct_count, incorrect_count)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                        ON CONFLICT (user_id, word)
                        DO UPDATE SET
                            strength = EXCLUDED.strength,
                            last_reviewed_at = EXCLUDED.last_reviewed_at,
                            correct_count = vocabulary.correct_count + EXCLUDED.correct_count,
                            incorrect_count = vocabulary.incorrect_count + EXCLUDED.incorrect_count",
                    )
                    .bind(update.user_id)
                    .bind(word)
                    .bind(translation)
                    .bind(example_phrase)
                    .bind(strength.as_str())
                    .bind(update.completed_at)
                    .bind(correct_count)
                    .bind(incorrect_count)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| e.any())?;
                }
                VocabularyChange::Update {
                    id,
                    strength,
                    correct_count,
                    incorrect_count,
                } => {
                    sqlx::query(
                        "UPDATE vocabulary SET
                            strength = $1,
                            correct_count = $2,
                            incorrect_count = $3,
                            last_reviewed_at = $4
                        WHERE id = $5",
                    )
                    .bind(strength.as_str())
                    .bind(correct_count)
                    .bind(incorrect_count)
                    .bind(update.completed_at)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| e.any())?;
                }
            }
        }

        for badge_id in &update.awarded_badges {
            sqlx::query(
                "INSERT INTO user_badges (user_id, badge_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, badge_id) DO NOTHING",
            )
            .bind(update.user_id)
            .bind(badge_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;
        }

        let user: UserData = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET xp = $1, level = $2, streak = $3, last_active_date = $4
            WHERE id = $5
            RETURNING *",
        )
        .bind(update.xp)
        .bind(update.level)
        .bind(update.streak)
        .bind(update.last_active_date)
        .bind(update.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.any())?
        .into();

        tx.commit().await.map_err(|e| e.any())?;

        Ok((user, user_lesson))
    }

    async fn apply_activity(&self, update: ActivityUpdate) -> Result<UserData> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        for badge_id in &update.awarded_badges {
            sqlx::query(
                "INSERT INTO user_badges (user_id, badge_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, badge_id) DO NOTHING",
            )
            .bind(update.user_id)
            .bind(badge_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;
        }

        let user: UserData = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET streak = $1, last_active_date = $2 WHERE id = $3 RETURNING *",
        )
        .bind(update.streak)
        .bind(update.last_active_date)
        .bind(update.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| e.not_found_or("user", "id"))?
        .into();

        tx.commit().await.map_err(|e| e.any())?;

        Ok(user)
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
