use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json,
};
use karatu_collab::{NewTrack, UpdatedTrack};

use crate::{
    auth::{AdminSession, Session},
    errors::ServerResult,
    schemas::{NewTrackSchema, UpdateTrackSchema, ValidatedJson},
    serialized::{Lesson, ToSerialized, Track},
    Router, ServerContext,
};

#[utoipa::path(
    get,
    path = "/v1/tracks",
    tag = "tracks",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Track>)
    )
)]
pub(crate) async fn list_tracks(
    _session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Track>>> {
    let tracks = context.karatu.catalog.list_tracks().await?;

    Ok(Json(tracks.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/tracks/{id}",
    tag = "tracks",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Track)
    )
)]
pub(crate) async fn track(
    _session: Session,
    State(context): State<ServerContext>,
    Path(track_id): Path<i32>,
) -> ServerResult<Json<Track>> {
    let track = context.karatu.catalog.track(track_id).await?;

    Ok(Json(track.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/tracks",
    tag = "tracks",
    request_body = NewTrackSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Track)
    )
)]
pub(crate) async fn create_track(
    _session: AdminSession,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewTrackSchema>,
) -> ServerResult<Json<Track>> {
    let track = context
        .karatu
        .catalog
        .create_track(NewTrack {
            name: body.name,
            description: body.description,
            language: body.language,
            icon: body.icon.unwrap_or_else(|| "Book".to_string()),
            order: body.order.unwrap_or_default(),
            locked: body.locked.unwrap_or_default(),
            unlock_level: body.unlock_level.unwrap_or(1),
        })
        .await?;

    Ok(Json(track.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/tracks/{id}",
    tag = "tracks",
    request_body = UpdateTrackSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Track)
    )
)]
pub(crate) async fn update_track(
    _session: AdminSession,
    State(context): State<ServerContext>,
    Path(track_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateTrackSchema>,
) -> ServerResult<Json<Track>> {
    let track = context
        .karatu
        .catalog
        .update_track(UpdatedTrack {
            id: track_id,
            name: body.name,
            description: body.description,
            icon: body.icon,
            locked: body.locked,
            unlock_level: body.unlock_level,
        })
        .await?;

    Ok(Json(track.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/tracks/{id}/lessons",
    tag = "tracks",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Lesson>)
    )
)]
pub(crate) async fn track_lessons(
    _session: Session,
    State(context): State<ServerContext>,
    Path(track_id): Path<i32>,
) -> ServerResult<Json<Vec<Lesson>>> {
    let lessons = context.karatu.catalog.lessons_by_track(track_id).await?;

    Ok(Json(lessons.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tracks))
        .route("/", post(create_track))
        .route("/:id", get(track))
        .route("/:id", patch(update_track))
        .route("/:id/lessons", get(track_lessons))
}
