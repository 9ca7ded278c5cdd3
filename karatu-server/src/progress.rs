use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json,
};
use karatu_collab::Database;
use serde::Deserialize;

use crate::{
    auth::Session,
    errors::ServerResult,
    serialized::{Badge, EarnedBadge, ToSerialized, User, UserLesson, Vocabulary},
    Router, ServerContext,
};

/// Leaderboard results are capped regardless of the requested limit
const MAX_LEADERBOARD_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/v1/activity",
    tag = "progress",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
pub(crate) async fn record_activity(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<User>> {
    let user = context
        .karatu
        .progress
        .record_activity(session.user().id)
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/progress",
    tag = "progress",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<UserLesson>)
    )
)]
pub(crate) async fn lesson_progress(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<UserLesson>>> {
    let rows = context
        .karatu
        .database()
        .list_user_lessons(session.user().id)
        .await?;

    Ok(Json(rows.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/vocabulary",
    tag = "progress",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Vocabulary>)
    )
)]
pub(crate) async fn vocabulary(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Vocabulary>>> {
    let rows = context
        .karatu
        .database()
        .list_vocabulary(session.user().id)
        .await?;

    Ok(Json(rows.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/badges",
    tag = "progress",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Badge>)
    )
)]
pub(crate) async fn badges(
    _session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Badge>>> {
    let badges = context.karatu.database().list_badges().await?;

    Ok(Json(badges.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/badges/earned",
    tag = "progress",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<EarnedBadge>)
    )
)]
pub(crate) async fn earned_badges(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<EarnedBadge>>> {
    let earned = context
        .karatu
        .database()
        .user_badges(session.user().id)
        .await?;

    Ok(Json(earned.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/leaderboard",
    tag = "progress",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum number of users to return")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<User>)
    )
)]
pub(crate) async fn leaderboard(
    _session: Session,
    State(context): State<ServerContext>,
    Query(query): Query<LeaderboardQuery>,
) -> ServerResult<Json<Vec<User>>> {
    let limit = query
        .limit
        .unwrap_or(MAX_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    let users = context.karatu.database().leaderboard(limit).await?;

    Ok(Json(users.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/activity", post(record_activity))
        .route("/progress", get(lesson_progress))
        .route("/vocabulary", get(vocabulary))
        .route("/badges", get(badges))
        .route("/badges/earned", get(earned_badges))
        .route("/leaderboard", get(leaderboard))
}
