use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use paperfeed_db::Database;
use paperfeed_db::models::FeedDetailRow;
use paperfeed_types::api::{FeedResponse, TopicResponse, UpdateFeedRequest, UserSummary};

use crate::access::{can_access, is_owner, load_feed};
use crate::auth::AppState;
use crate::comments::comment_response;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;

/// 50 MB upload limit
const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

pub(crate) fn feed_response(db: &Database, row: &FeedDetailRow) -> anyhow::Result<FeedResponse> {
    let host = match (&row.host_id, &row.host_username, &row.host_email) {
        (Some(id), Some(username), Some(email)) => Some(UserSummary {
            id: id.parse()?,
            username: username.clone(),
            email: email.clone(),
        }),
        _ => None,
    };
    let topic = match (&row.topic_id, &row.topic_label) {
        (Some(id), Some(label)) => Some(TopicResponse {
            id: id.parse()?,
            topic: label.clone(),
        }),
        _ => None,
    };
    let comments = db
        .list_comments(Some(&row.id))?
        .iter()
        .map(comment_response)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(FeedResponse {
        id: row.id.parse()?,
        host,
        topic,
        title: row.title.clone(),
        description: row.description.clone(),
        file_name: row.file_name.clone(),
        created_at: row.created_at.clone(),
        updated_at: row.updated_at.clone(),
        comments,
        comment_count: row.comment_count as usize,
    })
}

fn feed_responses(db: &Database, rows: &[FeedDetailRow]) -> anyhow::Result<Vec<FeedResponse>> {
    rows.iter().map(|row| feed_response(db, row)).collect()
}

pub async fn list_feeds(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_visible_feeds(&user.id.to_string(), None)?;
    Ok(Json(feed_responses(&state.db, &rows)?))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn search_feeds(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let q = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let rows = state.db.list_visible_feeds(&user.id.to_string(), q)?;
    Ok(Json(feed_responses(&state.db, &rows)?))
}

/// Multipart upload: `title`, optional `description` and `topic_name`,
/// and a `file` part that must be a PDF.
pub async fn create_feed(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut topic_name: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Invalid(format!("Malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "title" => title = Some(read_text(field).await?),
            "description" => description = Some(read_text(field).await?),
            "topic_name" => topic_name = Some(read_text(field).await?),
            "file" => {
                if field.content_type() != Some("application/pdf") {
                    return Err(ApiError::Invalid("Only PDF files are allowed.".into()));
                }
                file_name = Some(
                    field
                        .file_name()
                        .map(sanitize_file_name)
                        .unwrap_or_else(|| "document.pdf".into()),
                );
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Invalid(format!("Failed to read file: {e}")))?;
                if bytes.len() > MAX_FILE_SIZE {
                    return Err(ApiError::Invalid("File exceeds the 50 MB limit".into()));
                }
                file_bytes = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Invalid("Title is required".into()))?;
    let bytes = file_bytes.ok_or_else(|| ApiError::Invalid("A PDF file is required".into()))?;
    let file_name = file_name.unwrap_or_else(|| "document.pdf".into());

    let feed_id = Uuid::new_v4();

    // Blob lands on disk under a generated name; the client-supplied
    // name is display metadata only.
    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| {
            error!("Failed to create upload directory: {}", e);
            anyhow::anyhow!(e)
        })?;
    let disk_path = state.config.upload_dir.join(format!("{feed_id}.pdf"));
    tokio::fs::write(&disk_path, &bytes).await.map_err(|e| {
        error!("Failed to write {}: {}", disk_path.display(), e);
        anyhow::anyhow!(e)
    })?;

    let topic_id = Uuid::new_v4().to_string();
    let topic = topic_name
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|label| (topic_id.as_str(), label));

    let inserted = state.db.create_feed(
        &feed_id.to_string(),
        &user.id.to_string(),
        topic,
        title.trim(),
        description.as_deref().filter(|d| !d.trim().is_empty()),
        &disk_path.to_string_lossy(),
        &file_name,
    );
    if let Err(e) = inserted {
        // The blob is already on disk; don't orphan it.
        if let Err(rm) = tokio::fs::remove_file(&disk_path).await {
            if rm.kind() != std::io::ErrorKind::NotFound {
                error!("Failed to remove {}: {}", disk_path.display(), rm);
            }
        }
        return Err(e.into());
    }

    let detail = state
        .db
        .get_feed_detail(&feed_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("Feed vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(feed_response(&state.db, &detail)?)))
}

pub async fn get_feed(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(feed_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let detail = state
        .db
        .get_feed_detail(&feed_id.to_string())?
        .ok_or(ApiError::NotFound("Feed not found"))?;
    if !can_access(&state.db, &detail.id, detail.host_id.as_deref(), &user.id.to_string())? {
        return Err(ApiError::Forbidden("Not authorized to view this feed"));
    }
    Ok(Json(feed_response(&state.db, &detail)?))
}

pub async fn update_feed(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(feed_id): Path<Uuid>,
    Json(req): Json<UpdateFeedRequest>,
) -> ApiResult<impl IntoResponse> {
    let feed = load_feed(&state.db, &feed_id.to_string())?;
    if !is_owner(feed.host_id.as_deref(), &user.id.to_string()) {
        return Err(ApiError::Forbidden("Not authorized to update this feed"));
    }

    let topic_id = Uuid::new_v4().to_string();
    let topic = req
        .topic_name
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|label| (topic_id.as_str(), label));

    state.db.update_feed(
        &feed.id,
        req.title.as_deref(),
        req.description.as_deref(),
        topic,
    )?;

    let detail = state
        .db
        .get_feed_detail(&feed.id)?
        .ok_or(ApiError::NotFound("Feed not found"))?;
    Ok(Json(feed_response(&state.db, &detail)?))
}

pub async fn delete_feed(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(feed_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let feed = load_feed(&state.db, &feed_id.to_string())?;
    if !is_owner(feed.host_id.as_deref(), &user.id.to_string()) {
        return Err(ApiError::Forbidden("Not authorized to delete this feed"));
    }

    // Best effort on the blob; the row (and its cascading comments and
    // shares) is the source of truth.
    if let Err(e) = tokio::fs::remove_file(&feed.file_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            error!("Failed to remove {}: {}", feed.file_path, e);
        }
    }

    state.db.delete_feed(&feed.id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_feed(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(feed_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let feed = load_feed(&state.db, &feed_id.to_string())?;
    if !can_access(&state.db, &feed.id, feed.host_id.as_deref(), &user.id.to_string())? {
        return Err(ApiError::Forbidden("Not authorized to view this feed"));
    }

    let bytes = tokio::fs::read(&feed.file_path)
        .await
        .map_err(|_| ApiError::NotFound("File not found"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", feed.file_name),
            ),
        ],
        bytes,
    ))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Invalid(format!("Malformed multipart field: {e}")))
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '"' | '\0' => '_',
            c => c,
        })
        .collect()
}
