use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use karatu_collab::{Difficulty, Question};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(email, length(max = 128))]
    pub email: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 128))]
    pub email: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTrackSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 1024))]
    pub description: String,
    #[validate(length(min = 1, max = 64))]
    pub language: String,
    pub icon: Option<String>,
    pub order: Option<i32>,
    pub locked: Option<bool>,
    pub unlock_level: Option<i32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTrackSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 1024))]
    pub description: Option<String>,
    pub icon: Option<String>,
    pub locked: Option<bool>,
    pub unlock_level: Option<i32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewLessonSchema {
    pub track_id: i32,
    #[validate(length(min = 1, max = 128))]
    pub title: String,
    #[validate(length(min = 1, max = 1024))]
    pub description: String,
    #[schema(value_type = String)]
    pub difficulty: Difficulty,
    #[validate(range(min = 1))]
    pub xp_reward: i32,
    pub order: Option<i32>,
    #[schema(value_type = Vec<Object>)]
    pub questions: Vec<Question>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateLessonSchema {
    #[validate(length(min = 1, max = 128))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 1024))]
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 1))]
    pub xp_reward: Option<i32>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub questions: Option<Vec<Question>>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompleteLessonSchema {
    #[validate(range(min = 0))]
    pub score: i32,
    #[serde(default)]
    #[validate(nested)]
    pub vocabulary_updates: Vec<VocabularyUpdateSchema>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VocabularyUpdateSchema {
    #[validate(length(min = 1, max = 128))]
    pub word: String,
    #[validate(length(min = 1, max = 256))]
    pub translation: String,
    pub example_phrase: Option<String>,
    pub correct: bool,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewContributionSchema {
    /// Either "track" or "lesson"
    #[validate(length(min = 1, max = 16))]
    pub kind: String,
    pub track_id: Option<i32>,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReviewContributionSchema {
    /// Either "approved" or "rejected"
    #[validate(length(min = 1, max = 16))]
    pub status: String,
    #[validate(length(max = 1024))]
    pub comment: Option<String>,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
