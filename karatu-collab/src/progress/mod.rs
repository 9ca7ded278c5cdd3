mod badges;
mod memory;
mod streak;
mod xp;

pub use badges::*;
pub use memory::*;
pub use streak::*;
pub use xp::*;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::Utc;
use log::info;
use parking_lot::Mutex;
use tokio::sync::Mutex as UserLock;

use crate::{
    ActivityUpdate, CompletionUpdate, Database, DatabaseError, KaratuContext, MemoryStrength,
    PrimaryKey, UserData, UserLessonData, VocabularyChange,
};

/// Tunable behavior of the progress engine
#[derive(Debug, Clone, Copy)]
pub struct ProgressConfig {
    /// Whether re-completing a lesson grants its full xp reward again.
    /// Matches the historical behavior when enabled.
    pub repeat_reward: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            repeat_reward: true,
        }
    }
}

/// The rules engine that turns a finished lesson attempt into xp, level,
/// streak, vocabulary and badge updates. All decisions are computed up
/// front, then persisted through one atomic database call.
pub struct ProgressEngine<Db> {
    context: KaratuContext<Db>,
    config: ProgressConfig,
    /// Per-user locks. A completion reads counters, decides on new totals
    /// and writes them back, so the whole cycle must be serialized per
    /// user or two concurrent completions would base their totals on the
    /// same reads and the last writer would erase the other's reward.
    user_locks: Arc<Mutex<HashMap<PrimaryKey, Arc<UserLock<()>>>>>,
}

/// A word's counters as they will look once the batch is applied. Needed
/// because one batch may touch the same word more than once.
struct PendingWord {
    id: Option<PrimaryKey>,
    translation: String,
    example_phrase: Option<String>,
    strength: MemoryStrength,
    correct_count: i32,
    incorrect_count: i32,
}

impl<Db> ProgressEngine<Db>
where
    Db: Database,
{
    pub fn new(context: &KaratuContext<Db>, config: ProgressConfig) -> Self {
        Self {
            context: context.clone(),
            config,
            user_locks: Default::default(),
        }
    }

    fn user_lock(&self, user_id: PrimaryKey) -> Arc<UserLock<()>> {
        self.user_locks.lock().entry(user_id).or_default().clone()
    }

    /// The single entry point for "user finished lesson with score and
    /// per-word outcomes". Fails without side effects if the lesson or
    /// user doesn't exist, and applies either every effect or none.
    pub async fn complete_lesson(
        &self,
        user_id: PrimaryKey,
        lesson_id: PrimaryKey,
        score: i32,
        outcomes: Vec<WordOutcome>,
    ) -> Result<(UserData, UserLessonData), DatabaseError> {
        let db = &self.context.database;

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let lesson = db.lesson_by_id(lesson_id).await?;
        let user = db.user_by_id(user_id).await?;

        let existing = optional(db.user_lesson(user_id, lesson_id).await)?;
        let first_completion = existing.as_ref().map(|ul| !ul.completed).unwrap_or(true);

        let reward = if first_completion || self.config.repeat_reward {
            lesson.xp_reward
        } else {
            0
        };

        let new_xp = user.xp + reward;
        let new_level = level_for_xp(new_xp);

        let today = Utc::now().date_naive();
        let streak = advance_streak(user.streak, user.last_active_date, today);

        let vocabulary = self.plan_vocabulary(user_id, outcomes).await?;

        let completed_lessons =
            db.completed_lesson_count(user_id).await? + i64::from(first_completion);

        let snapshot = ProgressSnapshot {
            xp: new_xp,
            streak: streak.streak,
            completed_lessons,
        };

        let awarded_badges = self.newly_earned_badges(user_id, &snapshot).await?;

        let (user, user_lesson) = db
            .apply_completion(CompletionUpdate {
                user_id,
                lesson_id,
                score,
                completed_at: Utc::now(),
                xp: new_xp,
                level: new_level,
                streak: streak.streak,
                last_active_date: today,
                vocabulary,
                awarded_badges,
            })
            .await?;

        info!(
            "User {} completed lesson {} with score {}, now {} xp at level {}",
            user.username, lesson.title, score, user.xp, user.level
        );

        Ok((user, user_lesson))
    }

    /// Handles a bare "user was active today" signal. The streak decision
    /// is made here, never by the client.
    pub async fn record_activity(&self, user_id: PrimaryKey) -> Result<UserData, DatabaseError> {
        let db = &self.context.database;

        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let user = db.user_by_id(user_id).await?;

        let today = Utc::now().date_naive();
        let streak = advance_streak(user.streak, user.last_active_date, today);

        if !streak.changed {
            return Ok(user);
        }

        let snapshot = ProgressSnapshot {
            xp: user.xp,
            streak: streak.streak,
            completed_lessons: db.completed_lesson_count(user_id).await?,
        };

        let awarded_badges = self.newly_earned_badges(user_id, &snapshot).await?;

        db.apply_activity(ActivityUpdate {
            user_id,
            streak: streak.streak,
            last_active_date: today,
            awarded_badges,
        })
        .await
    }

    /// Turns the raw outcomes into concrete row changes, folding repeated
    /// words in the same batch into one change each
    async fn plan_vocabulary(
        &self,
        user_id: PrimaryKey,
        outcomes: Vec<WordOutcome>,
    ) -> Result<Vec<VocabularyChange>, DatabaseError> {
        let db = &self.context.database;

        let mut pending: HashMap<String, PendingWord> = HashMap::new();
        let mut order: Vec<String> = vec![];

        for outcome in outcomes {
            if !pending.contains_key(&outcome.word) {
                let existing = optional(db.vocabulary_by_word(user_id, &outcome.word).await)?;

                let entry = match existing {
                    Some(row) => PendingWord {
                        id: Some(row.id),
                        translation: row.translation,
                        example_phrase: row.example_phrase,
                        strength: row.strength,
                        correct_count: row.correct_count,
                        incorrect_count: row.incorrect_count,
                    },
                    None => PendingWord {
                        id: None,
                        translation: outcome.translation.clone(),
                        example_phrase: outcome.example_phrase.clone(),
                        strength: initial_strength(outcome.correct),
                        correct_count: 0,
                        incorrect_count: 0,
                    },
                };

                order.push(outcome.word.clone());
                pending.insert(outcome.word.clone(), entry);
            }

            if let Some(entry) = pending.get_mut(&outcome.word) {
                if outcome.correct {
                    entry.correct_count += 1;
                } else {
                    entry.incorrect_count += 1;
                }

                entry.strength =
                    advance_strength(entry.strength, entry.correct_count, entry.incorrect_count);
            }
        }

        let changes = order
            .into_iter()
            .filter_map(|word| pending.remove(&word).map(|entry| (word, entry)))
            .map(|(word, entry)| match entry.id {
                Some(id) => VocabularyChange::Update {
                    id,
                    strength: entry.strength,
                    correct_count: entry.correct_count,
                    incorrect_count: entry.incorrect_count,
                },
                None => VocabularyChange::Create {
                    word,
                    translation: entry.translation,
                    example_phrase: entry.example_phrase,
                    strength: entry.strength,
                    correct_count: entry.correct_count,
                    incorrect_count: entry.incorrect_count,
                },
            })
            .collect();

        Ok(changes)
    }

    /// Badges the user qualifies for but doesn't hold yet
    async fn newly_earned_badges(
        &self,
        user_id: PrimaryKey,
        snapshot: &ProgressSnapshot,
    ) -> Result<Vec<PrimaryKey>, DatabaseError> {
        let db = &self.context.database;

        let held: HashSet<_> = db
            .user_badges(user_id)
            .await?
            .into_iter()
            .map(|ub| ub.badge.id)
            .collect();

        let awarded = db
            .list_badges()
            .await?
            .into_iter()
            .filter(|badge| !held.contains(&badge.id))
            .filter(|badge| criteria_met(&badge.criteria, snapshot))
            .map(|badge| badge.id)
            .collect();

        Ok(awarded)
    }
}

fn optional<T>(result: Result<T, DatabaseError>) -> Result<Option<T>, DatabaseError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DatabaseError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Question, QuestionKind},
        BadgeData, ContributionData, ContributionReview, ContributionStatus, Difficulty,
        LessonData, MemoryDatabase, NewBadge, NewContribution, NewLesson, NewSession, NewTrack,
        NewUser, SessionData, TrackData, UpdatedLesson, UpdatedTrack, UserBadgeData,
        VocabularyData,
    };
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    type DbResult<T> = std::result::Result<T, DatabaseError>;

    fn outcome(word: &str, correct: bool) -> WordOutcome {
        WordOutcome {
            word: word.to_string(),
            translation: "Hello".to_string(),
            example_phrase: None,
            correct,
        }
    }

    fn question() -> Question {
        Question {
            kind: QuestionKind::Flashcard,
            question: "What is 'Sannu' in English?".to_string(),
            audio_url: None,
            pronunciation: None,
            tone_pattern: None,
            gender: None,
            options: None,
            correct_answer: "Hello".to_string(),
            vocabulary: vec![],
        }
    }

    async fn engine_with_lesson(
        xp_reward: i32,
        config: ProgressConfig,
    ) -> (ProgressEngine<MemoryDatabase>, KaratuContext<MemoryDatabase>, PrimaryKey, PrimaryKey)
    {
        engine_over(MemoryDatabase::new(), xp_reward, config).await
    }

    async fn engine_over<Db: Database>(
        database: Db,
        xp_reward: i32,
        config: ProgressConfig,
    ) -> (ProgressEngine<Db>, KaratuContext<Db>, PrimaryKey, PrimaryKey) {
        let context = KaratuContext {
            database: Arc::new(database),
        };

        let user = context
            .database
            .create_user(NewUser {
                username: "amina".to_string(),
                email: "amina@example.com".to_string(),
                password: "hash".to_string(),
                admin: false,
            })
            .await
            .expect("user is created");

        let track = context
            .database
            .create_track(NewTrack {
                name: "Basics & Greetings".to_string(),
                description: "Essential Hausa words".to_string(),
                language: "Hausa".to_string(),
                icon: "Book".to_string(),
                order: 1,
                locked: false,
                unlock_level: 1,
            })
            .await
            .expect("track is created");

        let lesson = context
            .database
            .create_lesson(NewLesson {
                track_id: track.id,
                title: "Greetings".to_string(),
                description: "Say hello".to_string(),
                difficulty: Difficulty::Easy,
                xp_reward,
                order: 1,
                questions: vec![question()],
            })
            .await
            .expect("lesson is created");

        let engine = ProgressEngine::new(&context, config);

        (engine, context, user.id, lesson.id)
    }

    #[tokio::test]
    async fn first_completion_grants_xp_and_levels_up() {
        let (engine, _, user_id, lesson_id) =
            engine_with_lesson(120, ProgressConfig::default()).await;

        let (user, user_lesson) = engine
            .complete_lesson(user_id, lesson_id, 3, vec![])
            .await
            .expect("completes");

        assert_eq!(user.xp, 120);
        assert_eq!(user.level, 2);
        assert!(user_lesson.completed);
        assert_eq!(user_lesson.score, 3);
    }

    #[tokio::test]
    async fn xp_accumulates_across_lessons() {
        let (engine, context, user_id, lesson_id) =
            engine_with_lesson(50, ProgressConfig::default()).await;

        // Start the user at 250 xp (level 3)
        context
            .database
            .set_user_progress(user_id, 250, level_for_xp(250))
            .await;

        let (user, _) = engine
            .complete_lesson(user_id, lesson_id, 1, vec![])
            .await
            .expect("completes");

        assert_eq!(user.xp, 300);
        assert_eq!(user.level, 4);
    }

    #[tokio::test]
    async fn recompletion_keeps_one_row_and_regrants_by_default() {
        let (engine, context, user_id, lesson_id) =
            engine_with_lesson(10, ProgressConfig::default()).await;

        engine
            .complete_lesson(user_id, lesson_id, 2, vec![])
            .await
            .expect("first attempt");
        let (user, user_lesson) = engine
            .complete_lesson(user_id, lesson_id, 4, vec![])
            .await
            .expect("second attempt");

        assert_eq!(user_lesson.score, 4);
        assert!(user_lesson.completed);
        // Full reward each time under the default config
        assert_eq!(user.xp, 20);

        let rows = context
            .database
            .list_user_lessons(user_id)
            .await
            .expect("lists");
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn recompletion_grants_nothing_when_repeat_reward_is_off() {
        let (engine, _, user_id, lesson_id) = engine_with_lesson(
            10,
            ProgressConfig {
                repeat_reward: false,
            },
        )
        .await;

        engine
            .complete_lesson(user_id, lesson_id, 2, vec![])
            .await
            .expect("first attempt");
        let (user, user_lesson) = engine
            .complete_lesson(user_id, lesson_id, 4, vec![])
            .await
            .expect("second attempt");

        assert_eq!(user.xp, 10);
        assert_eq!(user_lesson.score, 4);
    }

    #[tokio::test]
    async fn completing_a_missing_lesson_is_not_found() {
        let (engine, _, user_id, _) = engine_with_lesson(10, ProgressConfig::default()).await;

        let result = engine.complete_lesson(user_id, 999, 0, vec![]).await;

        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn third_correct_answer_promotes_a_word_to_known() {
        let (engine, context, user_id, lesson_id) =
            engine_with_lesson(10, ProgressConfig::default()).await;

        // Two correct answers leave the word short of the Known threshold
        for _ in 0..2 {
            engine
                .complete_lesson(user_id, lesson_id, 1, vec![outcome("Sannu", true)])
                .await
                .expect("completes");
        }

        let row = context
            .database
            .vocabulary_by_word(user_id, "Sannu")
            .await
            .expect("row exists");
        assert_eq!(row.correct_count, 2);

        engine
            .complete_lesson(user_id, lesson_id, 1, vec![outcome("Sannu", true)])
            .await
            .expect("completes");

        let row = context
            .database
            .vocabulary_by_word(user_id, "Sannu")
            .await
            .expect("row exists");
        assert_eq!(row.correct_count, 3);
        assert_eq!(row.strength, MemoryStrength::Known);
    }

    #[tokio::test]
    async fn one_wrong_answer_demotes_a_known_word() {
        let (engine, context, user_id, lesson_id) =
            engine_with_lesson(10, ProgressConfig::default()).await;

        for _ in 0..5 {
            engine
                .complete_lesson(user_id, lesson_id, 1, vec![outcome("Sannu", true)])
                .await
                .expect("completes");
        }

        engine
            .complete_lesson(user_id, lesson_id, 0, vec![outcome("Sannu", false)])
            .await
            .expect("completes");

        let row = context
            .database
            .vocabulary_by_word(user_id, "Sannu")
            .await
            .expect("row exists");
        assert_eq!(row.correct_count, 5);
        assert_eq!(row.incorrect_count, 1);
        assert_eq!(row.strength, MemoryStrength::Fuzzy);
    }

    #[tokio::test]
    async fn a_batch_touching_one_word_twice_folds_into_one_row() {
        let (engine, context, user_id, lesson_id) =
            engine_with_lesson(10, ProgressConfig::default()).await;

        engine
            .complete_lesson(
                user_id,
                lesson_id,
                1,
                vec![outcome("Sannu", true), outcome("Sannu", true)],
            )
            .await
            .expect("completes");

        let rows = context
            .database
            .list_vocabulary(user_id)
            .await
            .expect("lists");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].correct_count, 2);
    }

    #[tokio::test]
    async fn qualifying_badges_are_awarded_exactly_once() {
        let (engine, context, user_id, lesson_id) =
            engine_with_lesson(120, ProgressConfig::default()).await;

        context
            .database
            .create_badge(NewBadge {
                name: "Century".to_string(),
                description: "Reach 100 xp".to_string(),
                icon: "Star".to_string(),
                criteria: "100_xp".to_string(),
            })
            .await
            .expect("badge is created");
        context
            .database
            .create_badge(NewBadge {
                name: "First Steps".to_string(),
                description: "Complete your first lesson".to_string(),
                icon: "Footprints".to_string(),
                criteria: "complete_first_lesson".to_string(),
            })
            .await
            .expect("badge is created");

        engine
            .complete_lesson(user_id, lesson_id, 1, vec![])
            .await
            .expect("completes");

        let earned = context.database.user_badges(user_id).await.expect("lists");
        assert_eq!(earned.len(), 2);

        // Completing again must not double-award anything
        engine
            .complete_lesson(user_id, lesson_id, 1, vec![])
            .await
            .expect("completes");

        let earned = context.database.user_badges(user_id).await.expect("lists");
        assert_eq!(earned.len(), 2);
    }

    #[tokio::test]
    async fn completion_starts_a_streak() {
        let (engine, _, user_id, lesson_id) =
            engine_with_lesson(10, ProgressConfig::default()).await;

        let (user, _) = engine
            .complete_lesson(user_id, lesson_id, 1, vec![])
            .await
            .expect("completes");

        assert_eq!(user.streak, 1);
        assert!(user.last_active_date.is_some());
    }

    #[tokio::test]
    async fn activity_twice_on_the_same_day_is_a_no_op() {
        let (engine, _, user_id, _) = engine_with_lesson(10, ProgressConfig::default()).await;

        let first = engine.record_activity(user_id).await.expect("records");
        assert_eq!(first.streak, 1);

        let second = engine.record_activity(user_id).await.expect("records");
        assert_eq!(second.streak, 1);
        assert_eq!(second.last_active_date, first.last_active_date);
    }

    /// Delegates to a MemoryDatabase, but can stretch the user read out so
    /// two in-flight completions overlap, and can fail the final write.
    struct UnreliableDatabase {
        inner: MemoryDatabase,
        read_delay: Option<Duration>,
        fail_apply: AtomicBool,
    }

    impl UnreliableDatabase {
        fn new(read_delay: Option<Duration>) -> Self {
            Self {
                inner: MemoryDatabase::new(),
                read_delay,
                fail_apply: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl Database for UnreliableDatabase {
        async fn check_for_admin(&self) -> DbResult<bool> {
            self.inner.check_for_admin().await
        }

        async fn user_by_id(&self, user_id: PrimaryKey) -> DbResult<UserData> {
            if let Some(delay) = self.read_delay {
                tokio::time::sleep(delay).await;
            }

            self.inner.user_by_id(user_id).await
        }

        async fn user_by_username(&self, username: &str) -> DbResult<UserData> {
            self.inner.user_by_username(username).await
        }

        async fn user_by_email(&self, email: &str) -> DbResult<UserData> {
            self.inner.user_by_email(email).await
        }

        async fn create_user(&self, new_user: NewUser) -> DbResult<UserData> {
            self.inner.create_user(new_user).await
        }

        async fn leaderboard(&self, limit: i64) -> DbResult<Vec<UserData>> {
            self.inner.leaderboard(limit).await
        }

        async fn session_by_token(&self, token: &str) -> DbResult<SessionData> {
            self.inner.session_by_token(token).await
        }

        async fn create_session(&self, new_session: NewSession) -> DbResult<SessionData> {
            self.inner.create_session(new_session).await
        }

        async fn delete_session_by_token(&self, token: &str) -> DbResult<()> {
            self.inner.delete_session_by_token(token).await
        }

        async fn clear_expired_sessions(&self) -> DbResult<()> {
            self.inner.clear_expired_sessions().await
        }

        async fn track_by_id(&self, track_id: PrimaryKey) -> DbResult<TrackData> {
            self.inner.track_by_id(track_id).await
        }

        async fn list_tracks(&self) -> DbResult<Vec<TrackData>> {
            self.inner.list_tracks().await
        }

        async fn create_track(&self, new_track: NewTrack) -> DbResult<TrackData> {
            self.inner.create_track(new_track).await
        }

        async fn update_track(&self, updated_track: UpdatedTrack) -> DbResult<TrackData> {
            self.inner.update_track(updated_track).await
        }

        async fn lesson_by_id(&self, lesson_id: PrimaryKey) -> DbResult<LessonData> {
            self.inner.lesson_by_id(lesson_id).await
        }

        async fn lessons_by_track(&self, track_id: PrimaryKey) -> DbResult<Vec<LessonData>> {
            self.inner.lessons_by_track(track_id).await
        }

        async fn create_lesson(&self, new_lesson: NewLesson) -> DbResult<LessonData> {
            self.inner.create_lesson(new_lesson).await
        }

        async fn update_lesson(&self, updated_lesson: UpdatedLesson) -> DbResult<LessonData> {
            self.inner.update_lesson(updated_lesson).await
        }

        async fn vocabulary_by_word(
            &self,
            user_id: PrimaryKey,
            word: &str,
        ) -> DbResult<VocabularyData> {
            self.inner.vocabulary_by_word(user_id, word).await
        }

        async fn list_vocabulary(&self, user_id: PrimaryKey) -> DbResult<Vec<VocabularyData>> {
            self.inner.list_vocabulary(user_id).await
        }

        async fn user_lesson(
            &self,
            user_id: PrimaryKey,
            lesson_id: PrimaryKey,
        ) -> DbResult<UserLessonData> {
            self.inner.user_lesson(user_id, lesson_id).await
        }

        async fn list_user_lessons(&self, user_id: PrimaryKey) -> DbResult<Vec<UserLessonData>> {
            self.inner.list_user_lessons(user_id).await
        }

        async fn completed_lesson_count(&self, user_id: PrimaryKey) -> DbResult<i64> {
            self.inner.completed_lesson_count(user_id).await
        }

        async fn list_badges(&self) -> DbResult<Vec<BadgeData>> {
            self.inner.list_badges().await
        }

        async fn create_badge(&self, new_badge: NewBadge) -> DbResult<BadgeData> {
            self.inner.create_badge(new_badge).await
        }

        async fn user_badges(&self, user_id: PrimaryKey) -> DbResult<Vec<UserBadgeData>> {
            self.inner.user_badges(user_id).await
        }

        async fn contribution_by_id(
            &self,
            contribution_id: PrimaryKey,
        ) -> DbResult<ContributionData> {
            self.inner.contribution_by_id(contribution_id).await
        }

        async fn list_contributions(
            &self,
            status: Option<ContributionStatus>,
        ) -> DbResult<Vec<ContributionData>> {
            self.inner.list_contributions(status).await
        }

        async fn create_contribution(
            &self,
            new_contribution: NewContribution,
        ) -> DbResult<ContributionData> {
            self.inner.create_contribution(new_contribution).await
        }

        async fn review_contribution(
            &self,
            review: ContributionReview,
        ) -> DbResult<ContributionData> {
            self.inner.review_contribution(review).await
        }

        async fn apply_completion(
            &self,
            update: CompletionUpdate,
        ) -> DbResult<(UserData, UserLessonData)> {
            if self.fail_apply.load(Ordering::SeqCst) {
                return Err(DatabaseError::Internal("lost connection".into()));
            }

            self.inner.apply_completion(update).await
        }

        async fn apply_activity(&self, update: ActivityUpdate) -> DbResult<UserData> {
            self.inner.apply_activity(update).await
        }
    }

    #[tokio::test]
    async fn concurrent_completions_both_keep_their_reward() {
        let database = UnreliableDatabase::new(Some(Duration::from_millis(50)));
        let (engine, context, user_id, first_lesson) =
            engine_over(database, 10, ProgressConfig::default()).await;

        let lesson = context
            .database
            .lesson_by_id(first_lesson)
            .await
            .expect("lesson exists");
        let second_lesson = context
            .database
            .create_lesson(NewLesson {
                track_id: lesson.track_id,
                title: "Numbers".to_string(),
                description: "Count to ten".to_string(),
                difficulty: Difficulty::Easy,
                xp_reward: 10,
                order: 2,
                questions: vec![question()],
            })
            .await
            .expect("lesson is created");

        // Both completions read the user while planning their totals. If
        // the reads overlap, both start from the same xp and one reward
        // is lost on write.
        let (a, b) = tokio::join!(
            engine.complete_lesson(user_id, first_lesson, 1, vec![]),
            engine.complete_lesson(user_id, second_lesson.id, 1, vec![]),
        );
        a.expect("first completes");
        b.expect("second completes");

        let user = context
            .database
            .user_by_id(user_id)
            .await
            .expect("user exists");
        assert_eq!(user.xp, 20);
    }

    #[tokio::test]
    async fn a_failed_completion_leaves_no_partial_state() {
        let database = UnreliableDatabase::new(None);
        let (engine, context, user_id, lesson_id) =
            engine_over(database, 10, ProgressConfig::default()).await;

        engine
            .complete_lesson(user_id, lesson_id, 2, vec![outcome("Sannu", true)])
            .await
            .expect("completes");

        context.database.fail_apply.store(true, Ordering::SeqCst);

        let result = engine
            .complete_lesson(
                user_id,
                lesson_id,
                5,
                vec![outcome("Sannu", true), outcome("Ina kwana", true)],
            )
            .await;
        assert!(matches!(result, Err(DatabaseError::Internal(_))));

        // The user row, the attempt row and the vocabulary batch are all
        // untouched by the failed attempt
        let user = context
            .database
            .user_by_id(user_id)
            .await
            .expect("user exists");
        assert_eq!(user.xp, 10);

        let user_lesson = context
            .database
            .user_lesson(user_id, lesson_id)
            .await
            .expect("row exists");
        assert_eq!(user_lesson.score, 2);

        let rows = context
            .database
            .list_vocabulary(user_id)
            .await
            .expect("lists");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].word, "Sannu");
        assert_eq!(rows[0].correct_count, 1);
    }
}
