use axum::{extract::State, routing::post, Json};
use karatu_collab::CurriculumDocument;

use crate::{auth::AdminSession, errors::ServerResult, Router, ServerContext};

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    tracks: usize,
    lessons: usize,
}

#[utoipa::path(
    post,
    path = "/v1/curriculum/import",
    tag = "curriculum",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = ImportResult),
        (status = 400, description = "Document failed validation, nothing was imported")
    )
)]
pub(crate) async fn import(
    _session: AdminSession,
    State(context): State<ServerContext>,
    Json(document): Json<CurriculumDocument>,
) -> ServerResult<Json<ImportResult>> {
    let summary = context.karatu.catalog.import(document).await?;

    Ok(Json(ImportResult {
        tracks: summary.tracks,
        lessons: summary.lessons,
    }))
}

pub fn router() -> Router {
    Router::new().route("/import", post(import))
}
