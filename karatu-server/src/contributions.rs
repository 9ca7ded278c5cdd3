use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json,
};
use karatu_collab::{ContributionKind, ContributionStatus, NewContribution};
use serde::Deserialize;

use crate::{
    auth::{AdminSession, Session},
    errors::{ServerError, ServerResult},
    schemas::{NewContributionSchema, ReviewContributionSchema, ValidatedJson},
    serialized::{Contribution, ToSerialized},
    Router, ServerContext,
};

#[derive(Debug, Deserialize)]
struct ContributionQuery {
    status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/contributions",
    tag = "contributions",
    params(
        ("status" = Option<String>, Query, description = "Filter by pending, approved or rejected")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Contribution>)
    )
)]
pub(crate) async fn list_contributions(
    _session: Session,
    State(context): State<ServerContext>,
    Query(query): Query<ContributionQuery>,
) -> ServerResult<Json<Vec<Contribution>>> {
    let status = query
        .status
        .map(|raw| {
            ContributionStatus::from_str(&raw)
                .ok_or_else(|| ServerError::BadRequest(format!("Unknown status: {raw}")))
        })
        .transpose()?;

    let contributions = context.karatu.moderation.list(status).await?;

    Ok(Json(contributions.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/contributions",
    tag = "contributions",
    request_body = NewContributionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Contribution)
    )
)]
pub(crate) async fn create_contribution(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewContributionSchema>,
) -> ServerResult<Json<Contribution>> {
    let kind = ContributionKind::from_str(&body.kind)
        .ok_or_else(|| ServerError::BadRequest(format!("Unknown contribution kind: {}", body.kind)))?;

    let contribution = context
        .karatu
        .moderation
        .create(NewContribution {
            contributor_id: session.user().id,
            kind,
            track_id: body.track_id,
            payload: body.payload,
        })
        .await?;

    Ok(Json(contribution.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/contributions/{id}",
    tag = "contributions",
    request_body = ReviewContributionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Contribution),
        (status = 409, description = "Contribution has already been reviewed")
    )
)]
pub(crate) async fn review_contribution(
    session: AdminSession,
    State(context): State<ServerContext>,
    Path(contribution_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<ReviewContributionSchema>,
) -> ServerResult<Json<Contribution>> {
    let moderation = &context.karatu.moderation;
    let reviewer = session.user().id;

    let reviewed = match body.status.as_str() {
        "approved" => {
            moderation
                .approve(contribution_id, reviewer, body.comment)
                .await?
        }
        "rejected" => {
            moderation
                .reject(contribution_id, reviewer, body.comment)
                .await?
        }
        other => {
            return Err(ServerError::BadRequest(format!(
                "Review status must be approved or rejected, got {other}"
            )))
        }
    };

    Ok(Json(reviewed.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_contributions))
        .route("/", post(create_contribution))
        .route("/:id", patch(review_contribution))
}
