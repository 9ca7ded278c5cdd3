use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, contributions, curriculum, lessons, progress, schemas, serialized, tracks};

#[derive(OpenApi)]
#[openapi(
    modifiers(&Security),
    info(
        description = "karatu-server exposes endpoints to interact with this karatu instance"
    ),
    paths(
        auth::register,
        auth::register_admin,
        auth::login,
        auth::logout,
        auth::user,
        tracks::list_tracks,
        tracks::track,
        tracks::create_track,
        tracks::update_track,
        tracks::track_lessons,
        lessons::lesson,
        lessons::create_lesson,
        lessons::update_lesson,
        lessons::complete_lesson,
        progress::record_activity,
        progress::lesson_progress,
        progress::vocabulary,
        progress::badges,
        progress::earned_badges,
        progress::leaderboard,
        contributions::list_contributions,
        contributions::create_contribution,
        contributions::review_contribution,
        curriculum::import,
    ),
    components(schemas(
        serialized::User,
        serialized::LoginResult,
        serialized::Track,
        serialized::Lesson,
        serialized::Vocabulary,
        serialized::UserLesson,
        serialized::CompletionResult,
        serialized::Badge,
        serialized::EarnedBadge,
        serialized::Contribution,
        curriculum::ImportResult,
        schemas::RegisterSchema,
        schemas::LoginSchema,
        schemas::NewTrackSchema,
        schemas::UpdateTrackSchema,
        schemas::NewLessonSchema,
        schemas::UpdateLessonSchema,
        schemas::CompleteLessonSchema,
        schemas::VocabularyUpdateSchema,
        schemas::NewContributionSchema,
        schemas::ReviewContributionSchema,
    ))
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
