use chrono::Utc;
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    catalog::{validate_question, Question},
    CatalogError, ContributionData, ContributionKind, ContributionReview, ContributionStatus,
    Database, DatabaseError, Difficulty, KaratuContext, NewContribution, NewLesson, NewTrack,
    PrimaryKey,
};

/// Community content lands at the end of the display order
const COMMUNITY_ORDER: i32 = 999;

/// Handles community-submitted tracks and lessons
pub struct Moderation<Db> {
    context: KaratuContext<Db>,
}

#[derive(Debug, Error)]
pub enum ModerationError {
    /// The contribution was already approved or rejected
    #[error("Contribution has already been reviewed")]
    AlreadyReviewed,
    #[error("Invalid contribution payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl From<CatalogError> for ModerationError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::Validation { reason, .. } => Self::InvalidPayload(reason),
            CatalogError::Db(e) => Self::Db(e),
        }
    }
}

/// The payload shape of a track contribution
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackPayload {
    name: String,
    description: String,
    language: String,
    #[serde(default = "default_icon")]
    icon: String,
    #[serde(default)]
    is_locked: bool,
    #[serde(default = "default_unlock_level")]
    unlock_level: i32,
}

/// The payload shape of a lesson contribution
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonPayload {
    title: String,
    description: String,
    difficulty: Difficulty,
    xp_reward: i32,
    questions: Vec<Question>,
}

fn default_icon() -> String {
    "Book".to_string()
}

fn default_unlock_level() -> i32 {
    1
}

impl<Db> Moderation<Db>
where
    Db: Database,
{
    pub fn new(context: &KaratuContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Submits a new contribution. The payload is only sanity-checked here,
    /// full validation happens on approval.
    pub async fn create(
        &self,
        new_contribution: NewContribution,
    ) -> Result<ContributionData, ModerationError> {
        match new_contribution.kind {
            ContributionKind::Track => {
                parse_payload::<TrackPayload>(&new_contribution.payload)?;
            }
            ContributionKind::Lesson => {
                let track_id = new_contribution
                    .track_id
                    .ok_or_else(|| missing("a lesson contribution needs a trackId"))?;

                // The target track must exist up front
                self.context.database.track_by_id(track_id).await?;

                parse_payload::<LessonPayload>(&new_contribution.payload)?;
            }
        }

        Ok(self
            .context
            .database
            .create_contribution(new_contribution)
            .await?)
    }

    pub async fn get(&self, id: PrimaryKey) -> Result<ContributionData, DatabaseError> {
        self.context.database.contribution_by_id(id).await
    }

    pub async fn list(
        &self,
        status: Option<ContributionStatus>,
    ) -> Result<Vec<ContributionData>, DatabaseError> {
        self.context.database.list_contributions(status).await
    }

    /// Approves a contribution, materializing its payload into the catalog
    pub async fn approve(
        &self,
        id: PrimaryKey,
        reviewed_by: PrimaryKey,
        comment: Option<String>,
    ) -> Result<ContributionData, ModerationError> {
        let contribution = self.pending(id).await?;

        match contribution.kind {
            ContributionKind::Track => {
                let payload: TrackPayload = parse_payload(&contribution.payload)?;

                self.context
                    .database
                    .create_track(NewTrack {
                        name: payload.name,
                        description: payload.description,
                        language: payload.language,
                        icon: payload.icon,
                        order: COMMUNITY_ORDER,
                        locked: payload.is_locked,
                        unlock_level: payload.unlock_level,
                    })
                    .await?;
            }
            ContributionKind::Lesson => {
                let payload: LessonPayload = parse_payload(&contribution.payload)?;

                let track_id = contribution
                    .track_id
                    .ok_or_else(|| missing("lesson contribution lost its trackId"))?;

                for question in &payload.questions {
                    validate_question(question)?;
                }

                if payload.questions.is_empty() {
                    return Err(missing("a lesson needs at least one question"));
                }

                self.context
                    .database
                    .create_lesson(NewLesson {
                        track_id,
                        title: payload.title,
                        description: payload.description,
                        difficulty: payload.difficulty,
                        xp_reward: payload.xp_reward.max(1),
                        order: COMMUNITY_ORDER,
                        questions: payload.questions,
                    })
                    .await?;
            }
        }

        let reviewed = self
            .context
            .database
            .review_contribution(ContributionReview {
                id,
                status: ContributionStatus::Approved,
                reviewer_comment: comment,
                reviewed_by,
                reviewed_at: Utc::now(),
            })
            .await?;

        info!("Approved {} contribution {}", reviewed.kind.as_str(), id);

        Ok(reviewed)
    }

    /// Rejects a contribution without touching the catalog
    pub async fn reject(
        &self,
        id: PrimaryKey,
        reviewed_by: PrimaryKey,
        comment: Option<String>,
    ) -> Result<ContributionData, ModerationError> {
        self.pending(id).await?;

        let reviewed = self
            .context
            .database
            .review_contribution(ContributionReview {
                id,
                status: ContributionStatus::Rejected,
                reviewer_comment: comment,
                reviewed_by,
                reviewed_at: Utc::now(),
            })
            .await?;

        Ok(reviewed)
    }

    async fn pending(&self, id: PrimaryKey) -> Result<ContributionData, ModerationError> {
        let contribution = self.context.database.contribution_by_id(id).await?;

        if contribution.status != ContributionStatus::Pending {
            return Err(ModerationError::AlreadyReviewed);
        }

        Ok(contribution)
    }
}

fn parse_payload<'a, T>(payload: &'a serde_json::Value) -> Result<T, ModerationError>
where
    T: Deserialize<'a>,
{
    T::deserialize(payload).map_err(|e| ModerationError::InvalidPayload(e.to_string()))
}

fn missing(reason: &str) -> ModerationError {
    ModerationError::InvalidPayload(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryDatabase, NewUser};
    use serde_json::json;
    use std::sync::Arc;

    async fn setup() -> (KaratuContext<MemoryDatabase>, PrimaryKey, PrimaryKey) {
        let context = KaratuContext {
            database: Arc::new(MemoryDatabase::new()),
        };

        let contributor = context
            .database
            .create_user(NewUser {
                username: "amina".to_string(),
                email: "amina@example.com".to_string(),
                password: "hash".to_string(),
                admin: false,
            })
            .await
            .expect("creates contributor");

        let admin = context
            .database
            .create_user(NewUser {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password: "hash".to_string(),
                admin: true,
            })
            .await
            .expect("creates admin");

        (context, contributor.id, admin.id)
    }

    fn track_payload() -> serde_json::Value {
        json!({
            "name": "Yoruba Basics",
            "description": "Greetings and everyday phrases",
            "language": "Yoruba"
        })
    }

    fn lesson_payload() -> serde_json::Value {
        json!({
            "title": "Greetings",
            "description": "Say hello",
            "difficulty": "Easy",
            "xpReward": 10,
            "questions": [{
                "type": "flashcard",
                "question": "Pronounce: Sannu",
                "correctAnswer": "Hello"
            }]
        })
    }

    #[tokio::test]
    async fn approving_a_track_contribution_creates_the_track() {
        let (context, contributor, admin) = setup().await;
        let moderation = Moderation::new(&context);

        let contribution = moderation
            .create(NewContribution {
                contributor_id: contributor,
                kind: ContributionKind::Track,
                track_id: None,
                payload: track_payload(),
            })
            .await
            .expect("creates contribution");

        assert_eq!(contribution.status, ContributionStatus::Pending);

        let reviewed = moderation
            .approve(contribution.id, admin, Some("Looks good".to_string()))
            .await
            .expect("approves");

        assert_eq!(reviewed.status, ContributionStatus::Approved);
        assert_eq!(reviewed.reviewed_by, Some(admin));

        let tracks = context.database.list_tracks().await.expect("lists tracks");
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "Yoruba Basics");
        assert_eq!(tracks[0].order, COMMUNITY_ORDER);
    }

    #[tokio::test]
    async fn approving_a_lesson_contribution_creates_the_lesson() {
        let (context, contributor, admin) = setup().await;
        let moderation = Moderation::new(&context);

        let track = context
            .database
            .create_track(NewTrack {
                name: "Hausa Basics".to_string(),
                description: "Starter track".to_string(),
                language: "Hausa".to_string(),
                icon: "Book".to_string(),
                order: 0,
                locked: false,
                unlock_level: 1,
            })
            .await
            .expect("creates track");

        let contribution = moderation
            .create(NewContribution {
                contributor_id: contributor,
                kind: ContributionKind::Lesson,
                track_id: Some(track.id),
                payload: lesson_payload(),
            })
            .await
            .expect("creates contribution");

        moderation
            .approve(contribution.id, admin, None)
            .await
            .expect("approves");

        let lessons = context
            .database
            .lessons_by_track(track.id)
            .await
            .expect("lists lessons");

        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].title, "Greetings");
    }

    #[tokio::test]
    async fn rejection_leaves_the_catalog_untouched() {
        let (context, contributor, admin) = setup().await;
        let moderation = Moderation::new(&context);

        let contribution = moderation
            .create(NewContribution {
                contributor_id: contributor,
                kind: ContributionKind::Track,
                track_id: None,
                payload: track_payload(),
            })
            .await
            .expect("creates contribution");

        let reviewed = moderation
            .reject(contribution.id, admin, Some("Duplicate of Yoruba 101".to_string()))
            .await
            .expect("rejects");

        assert_eq!(reviewed.status, ContributionStatus::Rejected);
        assert_eq!(
            reviewed.reviewer_comment.as_deref(),
            Some("Duplicate of Yoruba 101")
        );

        let tracks = context.database.list_tracks().await.expect("lists tracks");
        assert!(tracks.is_empty());
    }

    #[tokio::test]
    async fn a_contribution_can_only_be_reviewed_once() {
        let (context, contributor, admin) = setup().await;
        let moderation = Moderation::new(&context);

        let contribution = moderation
            .create(NewContribution {
                contributor_id: contributor,
                kind: ContributionKind::Track,
                track_id: None,
                payload: track_payload(),
            })
            .await
            .expect("creates contribution");

        moderation
            .approve(contribution.id, admin, None)
            .await
            .expect("approves");

        let result = moderation.reject(contribution.id, admin, None).await;
        assert!(matches!(result, Err(ModerationError::AlreadyReviewed)));
    }

    #[tokio::test]
    async fn lesson_contribution_requires_an_existing_track() {
        let (context, contributor, _) = setup().await;
        let moderation = Moderation::new(&context);

        let result = moderation
            .create(NewContribution {
                contributor_id: contributor,
                kind: ContributionKind::Lesson,
                track_id: Some(999),
                payload: lesson_payload(),
            })
            .await;

        assert!(matches!(
            result,
            Err(ModerationError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_on_submission() {
        let (context, contributor, _) = setup().await;
        let moderation = Moderation::new(&context);

        let result = moderation
            .create(NewContribution {
                contributor_id: contributor,
                kind: ContributionKind::Track,
                track_id: None,
                payload: json!({ "name": "No description" }),
            })
            .await;

        assert!(matches!(result, Err(ModerationError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn status_filter_narrows_the_listing() {
        let (context, contributor, admin) = setup().await;
        let moderation = Moderation::new(&context);

        let first = moderation
            .create(NewContribution {
                contributor_id: contributor,
                kind: ContributionKind::Track,
                track_id: None,
                payload: track_payload(),
            })
            .await
            .expect("creates contribution");

        moderation
            .create(NewContribution {
                contributor_id: contributor,
                kind: ContributionKind::Track,
                track_id: None,
                payload: track_payload(),
            })
            .await
            .expect("creates contribution");

        moderation
            .approve(first.id, admin, None)
            .await
            .expect("approves");

        let pending = moderation
            .list(Some(ContributionStatus::Pending))
            .await
            .expect("lists pending");

        assert_eq!(pending.len(), 1);

        let all = moderation.list(None).await.expect("lists all");
        assert_eq!(all.len(), 2);
    }
}
