use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json,
};
use karatu_collab::{NewLesson, UpdatedLesson, WordOutcome};

use crate::{
    auth::{AdminSession, Session},
    errors::ServerResult,
    schemas::{CompleteLessonSchema, NewLessonSchema, UpdateLessonSchema, ValidatedJson},
    serialized::{CompletionResult, Lesson, ToSerialized},
    Router, ServerContext,
};

#[utoipa::path(
    get,
    path = "/v1/lessons/{id}",
    tag = "lessons",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Lesson)
    )
)]
pub(crate) async fn lesson(
    _session: Session,
    State(context): State<ServerContext>,
    Path(lesson_id): Path<i32>,
) -> ServerResult<Json<Lesson>> {
    let lesson = context.karatu.catalog.lesson(lesson_id).await?;

    Ok(Json(lesson.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/lessons",
    tag = "lessons",
    request_body = NewLessonSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Lesson)
    )
)]
pub(crate) async fn create_lesson(
    _session: AdminSession,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewLessonSchema>,
) -> ServerResult<Json<Lesson>> {
    let lesson = context
        .karatu
        .catalog
        .create_lesson(NewLesson {
            track_id: body.track_id,
            title: body.title,
            description: body.description,
            difficulty: body.difficulty,
            xp_reward: body.xp_reward,
            order: body.order.unwrap_or_default(),
            questions: body.questions,
        })
        .await?;

    Ok(Json(lesson.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/lessons/{id}",
    tag = "lessons",
    request_body = UpdateLessonSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Lesson)
    )
)]
pub(crate) async fn update_lesson(
    _session: AdminSession,
    State(context): State<ServerContext>,
    Path(lesson_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateLessonSchema>,
) -> ServerResult<Json<Lesson>> {
    let lesson = context
        .karatu
        .catalog
        .update_lesson(UpdatedLesson {
            id: lesson_id,
            title: body.title,
            description: body.description,
            difficulty: body.difficulty,
            xp_reward: body.xp_reward,
            questions: body.questions,
        })
        .await?;

    Ok(Json(lesson.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/lessons/{id}/complete",
    tag = "lessons",
    request_body = CompleteLessonSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = CompletionResult)
    )
)]
pub(crate) async fn complete_lesson(
    session: Session,
    State(context): State<ServerContext>,
    Path(lesson_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<CompleteLessonSchema>,
) -> ServerResult<Json<CompletionResult>> {
    let outcomes = body
        .vocabulary_updates
        .into_iter()
        .map(|update| WordOutcome {
            word: update.word,
            translation: update.translation,
            example_phrase: update.example_phrase,
            correct: update.correct,
        })
        .collect();

    let (user, user_lesson) = context
        .karatu
        .progress
        .complete_lesson(session.user().id, lesson_id, body.score, outcomes)
        .await?;

    Ok(Json(CompletionResult {
        user_lesson: user_lesson.to_serialized(),
        user: user.to_serialized(),
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_lesson))
        .route("/:id", get(lesson))
        .route("/:id", patch(update_lesson))
        .route("/:id/complete", post(complete_lesson))
}
