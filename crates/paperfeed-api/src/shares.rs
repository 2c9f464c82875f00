use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;
use uuid::Uuid;

use paperfeed_db::models::{FileShareRow, UserShareDetailRow, UserShareInsert};
use paperfeed_types::api::{
    CreatePublicShareRequest, CreateUserShareRequest, InvitedCommentRequest, PublicShareResponse,
    ShareAck, UserShareResponse, UserSummary,
};

use crate::access::{can_access, is_owner, load_feed};
use crate::auth::AppState;
use crate::comments::comment_response;
use crate::error::{ApiError, ApiResult};
use crate::feeds::feed_response;
use crate::middleware::CurrentUser;

// -- Public share lifecycle --

/// Read-time state of an active public share. Expiry is derived, never
/// stored: discovering it must not mutate the row.
#[derive(Debug, PartialEq, Eq)]
pub enum ShareState {
    Valid,
    Expired,
}

/// A share is expired iff its expiry instant is strictly before `now`;
/// a share expiring exactly at `now` is still valid.
pub fn share_state(expires_at: Option<&str>, now: DateTime<Utc>) -> anyhow::Result<ShareState> {
    match expires_at {
        None => Ok(ShareState::Valid),
        Some(raw) => {
            let expires = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| anyhow::anyhow!("Corrupt expiry timestamp {raw:?}: {e}"))?
                .with_timezone(&Utc);
            if expires < now {
                Ok(ShareState::Expired)
            } else {
                Ok(ShareState::Valid)
            }
        }
    }
}

/// 32 random bytes, URL-safe base64: 256 bits of entropy per token.
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Token lookup shared by every public-share entry point. Revoked and
/// unknown tokens are indistinguishable; expiry is a distinct condition
/// with a distinct status.
fn resolve_share(state: &AppState, token: &str) -> ApiResult<FileShareRow> {
    let share = state
        .db
        .get_active_file_share_by_token(token)?
        .ok_or(ApiError::NotFound("Share not found or inactive"))?;
    match share_state(share.expires_at.as_deref(), Utc::now())? {
        ShareState::Valid => Ok(share),
        ShareState::Expired => Err(ApiError::Expired("Share link has expired")),
    }
}

pub async fn create_public_share(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreatePublicShareRequest>,
) -> ApiResult<impl IntoResponse> {
    let feed = load_feed(&state.db, &req.feed_id.to_string())?;
    if !is_owner(feed.host_id.as_deref(), &user.id.to_string()) {
        return Err(ApiError::Forbidden("Not authorized to share this feed"));
    }
    if req.expires_in_days.is_some_and(|d| d < 0) {
        return Err(ApiError::Invalid("expires_in_days must not be negative".into()));
    }

    let now = Utc::now();
    let expires_at = req
        .expires_in_days
        .map(|days| (now + chrono::Duration::days(days)).to_rfc3339_opts(SecondsFormat::Micros, true));

    let token = generate_share_token();
    state.db.insert_file_share(
        &Uuid::new_v4().to_string(),
        &feed.id,
        &token,
        &user.id.to_string(),
        &now.to_rfc3339_opts(SecondsFormat::Micros, true),
        expires_at.as_deref(),
    )?;

    let share_url = format!("/view/shared/{token}");
    Ok((
        StatusCode::CREATED,
        Json(PublicShareResponse {
            share_token: token,
            share_url,
            expires_at,
        }),
    ))
}

/// Owner-guarded revocation, symmetric with user shares. One-way:
/// a revoked token can only be replaced, never reactivated.
pub async fn revoke_public_share(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(share_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let share = state
        .db
        .get_file_share(&share_id.to_string())?
        .ok_or(ApiError::NotFound("Share not found"))?;
    let feed = load_feed(&state.db, &share.feed_id)?;
    if !is_owner(feed.host_id.as_deref(), &user.id.to_string()) {
        return Err(ApiError::Forbidden("Not authorized to remove this share"));
    }

    state.db.deactivate_file_share(&share.id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_shared_feed(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let share = resolve_share(&state, &token)?;
    let detail = state
        .db
        .get_feed_detail(&share.feed_id)?
        .ok_or(ApiError::NotFound("Feed not found"))?;
    Ok(Json(feed_response(&state.db, &detail)?))
}

pub async fn list_invited_comments(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let share = resolve_share(&state, &token)?;
    let comments = state
        .db
        .list_comments(Some(&share.feed_id))?
        .iter()
        .map(comment_response)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(comments))
}

/// Anonymous attribution: no author id, name is whatever the visitor
/// typed.
pub async fn post_invited_comment(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<InvitedCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let share = resolve_share(&state, &token)?;

    let name = req.commenter_name.trim();
    if name.is_empty() {
        return Err(ApiError::Invalid("Commenter name is required".into()));
    }

    let id = Uuid::new_v4().to_string();
    state
        .db
        .insert_comment(&id, &share.feed_id, None, name, &req.comment_body)?;

    let row = state
        .db
        .get_comment(&id)?
        .ok_or_else(|| anyhow::anyhow!("Comment vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(comment_response(&row)?)))
}

// -- User share lifecycle --

fn user_share_response(row: &UserShareDetailRow) -> anyhow::Result<UserShareResponse> {
    Ok(UserShareResponse {
        id: row.id.parse()?,
        feed_id: row.feed_id.parse()?,
        shared_by: UserSummary {
            id: row.shared_by_id.parse()?,
            username: row.shared_by_username.clone(),
            email: row.shared_by_email.clone(),
        },
        shared_with: UserSummary {
            id: row.shared_with_id.parse()?,
            username: row.shared_with_username.clone(),
            email: row.shared_with_email.clone(),
        },
        created_at: row.created_at.clone(),
    })
}

/// Delegated sharing: any current holder of access (owner or active
/// recipient) may extend it to a third party.
pub async fn share_with_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateUserShareRequest>,
) -> ApiResult<impl IntoResponse> {
    let feed = load_feed(&state.db, &req.feed_id.to_string())?;
    if !can_access(&state.db, &feed.id, feed.host_id.as_deref(), &user.id.to_string())? {
        return Err(ApiError::Forbidden("Not authorized to share this feed"));
    }

    let target = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::NotFound("User with this email not found"))?;

    match state.db.create_user_share(
        &Uuid::new_v4().to_string(),
        &feed.id,
        &user.id.to_string(),
        &target.id,
    )? {
        UserShareInsert::Created => Ok(Json(ShareAck {
            success: true,
            message: "PDF Shared Successfully".into(),
        })),
        UserShareInsert::AlreadyShared => {
            Err(ApiError::Conflict("Feed already shared with this user"))
        }
    }
}

/// Feeds shared with the caller, comment counts included.
pub async fn shared_with_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_shared_with_me(&user.id.to_string())?;
    let feeds = rows
        .iter()
        .map(|row| feed_response(&state.db, row))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(feeds))
}

/// Three independent authorization paths: sharer, recipient, or feed
/// owner. Revoking an already-inactive share succeeds silently.
pub async fn revoke_user_share(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(share_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let share = state
        .db
        .get_user_share(&share_id.to_string())?
        .ok_or(ApiError::NotFound("Share not found"))?;

    let uid = user.id.to_string();
    let authorized = share.shared_by_id == uid || share.shared_with_id == uid || {
        let feed = state.db.get_feed(&share.feed_id)?;
        feed.is_some_and(|f| is_owner(f.host_id.as_deref(), &uid))
    };
    if !authorized {
        return Err(ApiError::Forbidden("Not authorized to remove this share"));
    }

    state.db.deactivate_user_share(&share.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Owner-only view of who a feed is shared with.
pub async fn list_feed_shares(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(feed_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let feed = load_feed(&state.db, &feed_id.to_string())?;
    if !is_owner(feed.host_id.as_deref(), &user.id.to_string()) {
        return Err(ApiError::Forbidden("Not authorized to view this information"));
    }

    let shares = state
        .db
        .list_active_shares_for_feed(&feed.id)?
        .iter()
        .map(user_share_response)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(shares))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn no_expiry_is_always_valid() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(share_state(None, now).unwrap(), ShareState::Valid);
    }

    #[test]
    fn past_expiry_is_expired() {
        let now = ts("2025-06-01T12:00:00.000001Z");
        let state = share_state(Some("2025-06-01T12:00:00.000000Z"), now).unwrap();
        assert_eq!(state, ShareState::Expired);
    }

    #[test]
    fn expiry_equal_to_now_is_still_valid() {
        // Boundary pinned: strictly-less-than means expired.
        let now = ts("2025-06-01T12:00:00.000000Z");
        let state = share_state(Some("2025-06-01T12:00:00.000000Z"), now).unwrap();
        assert_eq!(state, ShareState::Valid);
    }

    #[test]
    fn future_expiry_is_valid() {
        let now = ts("2025-06-01T12:00:00Z");
        let state = share_state(Some("2025-06-08T12:00:00Z"), now).unwrap();
        assert_eq!(state, ShareState::Valid);
    }

    #[test]
    fn corrupt_expiry_is_an_error_not_a_grant() {
        let now = Utc::now();
        assert!(share_state(Some("not-a-timestamp"), now).is_err());
    }

    #[test]
    fn tokens_are_long_unique_and_url_safe() {
        let a = generate_share_token();
        let b = generate_share_token();
        assert_ne!(a, b);
        // 32 bytes -> 43 unpadded base64 chars
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
