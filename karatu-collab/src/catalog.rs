use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Database, DatabaseError, Difficulty, KaratuContext, LessonData, NewLesson, NewTrack,
    PrimaryKey, TrackData, UpdatedLesson, UpdatedTrack,
};

/// One quiz item inside a lesson. Stored as part of the lesson's JSON
/// question list, not as a standalone row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    /// Pronunciation aid, e.g. "high" or "low"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone_pattern: Option<String>,
    /// Grammatical gender aid for languages that need it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vocabulary: Vec<VocabularyEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    FillInBlank,
    Flashcard,
    Speak,
    Match,
}

/// A word embedded in a question, copied into the learner's vocabulary
/// when the lesson is completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub word: String,
    pub translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_phrase: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid {resource}: {reason}")]
    Validation {
        resource: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// A whole curriculum as submitted to the import endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumDocument {
    pub tracks: Vec<CurriculumTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumTrack {
    pub name: String,
    pub description: String,
    pub language: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default = "default_unlock_level")]
    pub unlock_level: i32,
    pub lessons: Vec<CurriculumLesson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumLesson {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub xp_reward: i32,
    #[serde(default)]
    pub order: i32,
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub tracks: usize,
    pub lessons: usize,
}

fn default_icon() -> String {
    "Book".to_string()
}

fn default_unlock_level() -> i32 {
    1
}

/// Manages the track and lesson catalog
pub struct Catalog<Db> {
    context: KaratuContext<Db>,
}

impl<Db> Catalog<Db>
where
    Db: Database,
{
    pub fn new(context: &KaratuContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn list_tracks(&self) -> Result<Vec<TrackData>, DatabaseError> {
        self.context.database.list_tracks().await
    }

    pub async fn track(&self, track_id: PrimaryKey) -> Result<TrackData, DatabaseError> {
        self.context.database.track_by_id(track_id).await
    }

    pub async fn create_track(&self, new_track: NewTrack) -> CatalogResult<TrackData> {
        validate_track(&new_track.name, &new_track.description)?;

        Ok(self.context.database.create_track(new_track).await?)
    }

    pub async fn update_track(&self, updated_track: UpdatedTrack) -> CatalogResult<TrackData> {
        Ok(self.context.database.update_track(updated_track).await?)
    }

    pub async fn lessons_by_track(
        &self,
        track_id: PrimaryKey,
    ) -> Result<Vec<LessonData>, DatabaseError> {
        // Ensure the track exists so a bogus id is a not found, not an empty list
        let track = self.context.database.track_by_id(track_id).await?;

        self.context.database.lessons_by_track(track.id).await
    }

    pub async fn lesson(&self, lesson_id: PrimaryKey) -> Result<LessonData, DatabaseError> {
        self.context.database.lesson_by_id(lesson_id).await
    }

    pub async fn create_lesson(&self, new_lesson: NewLesson) -> CatalogResult<LessonData> {
        validate_lesson(
            &new_lesson.title,
            new_lesson.xp_reward,
            &new_lesson.questions,
        )?;

        // The target track must exist
        self.context.database.track_by_id(new_lesson.track_id).await?;

        Ok(self.context.database.create_lesson(new_lesson).await?)
    }

    pub async fn update_lesson(&self, updated_lesson: UpdatedLesson) -> CatalogResult<LessonData> {
        if let Some(questions) = &updated_lesson.questions {
            for question in questions {
                validate_question(question)?;
            }
        }

        Ok(self.context.database.update_lesson(updated_lesson).await?)
    }

    /// Imports a whole curriculum document. The document is validated
    /// wholesale before anything is inserted, so a bad lesson in the last
    /// track leaves the catalog untouched.
    pub async fn import(&self, document: CurriculumDocument) -> CatalogResult<ImportSummary> {
        for track in &document.tracks {
            validate_track(&track.name, &track.description)?;

            for lesson in &track.lessons {
                validate_lesson(&lesson.title, lesson.xp_reward, &lesson.questions)?;
            }
        }

        let mut summary = ImportSummary {
            tracks: 0,
            lessons: 0,
        };

        for track in document.tracks {
            let created = self
                .context
                .database
                .create_track(NewTrack {
                    name: track.name,
                    description: track.description,
                    language: track.language,
                    icon: track.icon,
                    order: track.order,
                    locked: track.is_locked,
                    unlock_level: track.unlock_level,
                })
                .await?;

            summary.tracks += 1;

            for lesson in track.lessons {
                self.context
                    .database
                    .create_lesson(NewLesson {
                        track_id: created.id,
                        title: lesson.title,
                        description: lesson.description,
                        difficulty: lesson.difficulty,
                        xp_reward: lesson.xp_reward,
                        order: lesson.order,
                        questions: lesson.questions,
                    })
                    .await?;

                summary.lessons += 1;
            }
        }

        info!(
            "Imported {} tracks with {} lessons",
            summary.tracks, summary.lessons
        );

        Ok(summary)
    }
}

/// Compares a submitted answer against the expected one, ignoring case
/// and whitespace differences
pub fn answer_matches(expected: &str, given: &str) -> bool {
    normalize_answer(expected) == normalize_answer(given)
}

fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn validate_track(name: &str, description: &str) -> CatalogResult<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::Validation {
            resource: "track",
            reason: "name must not be empty".to_string(),
        });
    }

    if description.trim().is_empty() {
        return Err(CatalogError::Validation {
            resource: "track",
            reason: "description must not be empty".to_string(),
        });
    }

    Ok(())
}

fn validate_lesson(title: &str, xp_reward: i32, questions: &[Question]) -> CatalogResult<()> {
    if title.trim().is_empty() {
        return Err(CatalogError::Validation {
            resource: "lesson",
            reason: "title must not be empty".to_string(),
        });
    }

    if xp_reward <= 0 {
        return Err(CatalogError::Validation {
            resource: "lesson",
            reason: "xpReward must be positive".to_string(),
        });
    }

    if questions.is_empty() {
        return Err(CatalogError::Validation {
            resource: "lesson",
            reason: "a lesson needs at least one question".to_string(),
        });
    }

    for question in questions {
        validate_question(question)?;
    }

    Ok(())
}

/// Enforces the question invariants. Choice-like kinds must carry a
/// non-empty option list that includes the correct answer.
pub fn validate_question(question: &Question) -> CatalogResult<()> {
    if question.question.trim().is_empty() {
        return Err(CatalogError::Validation {
            resource: "question",
            reason: "prompt must not be empty".to_string(),
        });
    }

    if question.correct_answer.trim().is_empty() {
        return Err(CatalogError::Validation {
            resource: "question",
            reason: "correctAnswer must not be empty".to_string(),
        });
    }

    if matches!(
        question.kind,
        QuestionKind::MultipleChoice | QuestionKind::Match
    ) {
        let options = question.options.as_deref().unwrap_or_default();

        if options.is_empty() {
            return Err(CatalogError::Validation {
                resource: "question",
                reason: "choice questions need a non-empty option list".to_string(),
            });
        }

        if !options
            .iter()
            .any(|o| answer_matches(o, &question.correct_answer))
        {
            return Err(CatalogError::Validation {
                resource: "question",
                reason: "option list must include the correct answer".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice_question(options: &[&str], answer: &str) -> Question {
        Question {
            kind: QuestionKind::MultipleChoice,
            question: "How do you say 'Hello' in Hausa?".to_string(),
            audio_url: None,
            pronunciation: None,
            tone_pattern: None,
            gender: None,
            options: Some(options.iter().map(|o| o.to_string()).collect()),
            correct_answer: answer.to_string(),
            vocabulary: vec![],
        }
    }

    #[test]
    fn answers_ignore_case_and_whitespace() {
        assert!(answer_matches("Sannu", "  sannu "));
        assert!(answer_matches("Barka da safe", "barka  da   SAFE"));
        assert!(!answer_matches("Sannu", "Na gode"));
    }

    #[test]
    fn choice_question_requires_options() {
        let mut question = choice_question(&["Sannu", "Na gode"], "Sannu");
        assert!(validate_question(&question).is_ok());

        question.options = None;
        assert!(validate_question(&question).is_err());
    }

    #[test]
    fn choice_question_options_must_include_answer() {
        let question = choice_question(&["Na gode", "Sai anjima"], "Sannu");
        assert!(validate_question(&question).is_err());
    }

    #[test]
    fn flashcard_does_not_need_options() {
        let question = Question {
            kind: QuestionKind::Flashcard,
            question: "Pronounce: Ina kwana".to_string(),
            audio_url: None,
            pronunciation: Some("ee-nah kwah-nah".to_string()),
            tone_pattern: None,
            gender: None,
            options: None,
            correct_answer: "Good morning".to_string(),
            vocabulary: vec![],
        };

        assert!(validate_question(&question).is_ok());
    }

    #[test]
    fn question_json_round_trips_with_camel_case_keys() {
        let json = r#"{
            "type": "multiple_choice",
            "question": "How do you say 'Hello' in Hausa?",
            "options": ["Sannu", "Na gode"],
            "correctAnswer": "Sannu",
            "vocabulary": [{ "word": "Sannu", "translation": "Hello", "examplePhrase": "Sannu, yaya lafiya?" }]
        }"#;

        let question: Question = serde_json::from_str(json).expect("parses");

        assert_eq!(question.kind, QuestionKind::MultipleChoice);
        assert_eq!(question.vocabulary[0].word, "Sannu");
        assert_eq!(
            question.vocabulary[0].example_phrase.as_deref(),
            Some("Sannu, yaya lafiya?")
        );

        let value = serde_json::to_value(&question).expect("serializes");
        assert_eq!(value["correctAnswer"], "Sannu");
    }
}
