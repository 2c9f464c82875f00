use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use paperfeed_db::models::CommentRow;
use paperfeed_types::api::{CommentResponse, CreateCommentRequest, UpdateCommentRequest};

use crate::access::load_feed;
use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;

pub(crate) fn comment_response(row: &CommentRow) -> anyhow::Result<CommentResponse> {
    Ok(CommentResponse {
        id: row.id.parse()?,
        feed_id: row.feed_id.parse()?,
        user_id: row.user_id.as_deref().map(str::parse).transpose()?,
        commenter_name: row.commenter_name.clone(),
        comment_body: row.comment_body.clone(),
        created_at: row.created_at.clone(),
        updated_at: row.updated_at.clone(),
    })
}

#[derive(Debug, Deserialize)]
pub struct CommentQuery {
    pub feed_id: Option<Uuid>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
) -> ApiResult<impl IntoResponse> {
    let feed_id = query.feed_id.map(|id| id.to_string());
    let comments = state
        .db
        .list_comments(feed_id.as_deref())?
        .iter()
        .map(comment_response)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(comments))
}

/// Authenticated attribution: the author id is attached and
/// `commenter_name` snapshots the username at post time. Later username
/// changes do not rewrite history.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let feed = load_feed(&state.db, &req.feed_id.to_string())?;

    let id = Uuid::new_v4().to_string();
    state.db.insert_comment(
        &id,
        &feed.id,
        Some(&user.id.to_string()),
        &user.username,
        &req.comment_body,
    )?;

    let row = state
        .db
        .get_comment(&id)?
        .ok_or_else(|| anyhow::anyhow!("Comment vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(comment_response(&row)?)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or(ApiError::NotFound("Comment not found"))?;
    Ok(Json(comment_response(&row)?))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(comment_id): Path<Uuid>,
    Json(req): Json<UpdateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or(ApiError::NotFound("Comment not found"))?;
    if row.user_id.as_deref() != Some(user.id.to_string().as_str()) {
        return Err(ApiError::Forbidden("Not authorized to update this comment"));
    }

    state.db.update_comment(&row.id, &req.comment_body)?;
    let row = state
        .db
        .get_comment(&row.id)?
        .ok_or(ApiError::NotFound("Comment not found"))?;
    Ok(Json(comment_response(&row)?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or(ApiError::NotFound("Comment not found"))?;
    if row.user_id.as_deref() != Some(user.id.to_string().as_str()) {
        return Err(ApiError::Forbidden("Not authorized to delete this comment"));
    }

    state.db.delete_comment(&row.id)?;
    Ok(StatusCode::NO_CONTENT)
}
