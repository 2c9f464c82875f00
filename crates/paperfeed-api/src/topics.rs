use axum::{Json, extract::{Path, State}, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use paperfeed_db::models::TopicRow;
use paperfeed_types::api::{CreateTopicRequest, TopicResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

pub(crate) fn topic_response(row: &TopicRow) -> anyhow::Result<TopicResponse> {
    Ok(TopicResponse {
        id: row.id.parse()?,
        topic: row.topic.clone(),
    })
}

pub async fn list_topics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let topics = state
        .db
        .list_topics()?
        .iter()
        .map(topic_response)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(topics))
}

/// Get-or-create: posting an existing label returns the stored topic
/// rather than erroring.
pub async fn create_topic(
    State(state): State<AppState>,
    Json(req): Json<CreateTopicRequest>,
) -> ApiResult<impl IntoResponse> {
    let label = req.topic.trim();
    if label.is_empty() || label.len() > 150 {
        return Err(ApiError::Invalid(
            "Topic label must be between 1 and 150 characters".into(),
        ));
    }

    let row = state
        .db
        .get_or_create_topic(&Uuid::new_v4().to_string(), label)?;
    Ok((StatusCode::CREATED, Json(topic_response(&row)?)))
}

pub async fn get_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_topic(&topic_id.to_string())?
        .ok_or(ApiError::NotFound("Topic not found"))?;
    Ok(Json(topic_response(&row)?))
}
