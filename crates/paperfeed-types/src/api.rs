use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared between the auth handlers (encoding) and the
/// request middleware (decoding). Canonical definition lives here in
/// paperfeed-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub access_token: String,
    pub token_type: String,
}

// -- Users --

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: String,
}

/// Sparse profile patch: only the provided fields change.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Minimal identity embedded in feed and share responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

// -- Topics --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTopicRequest {
    pub topic: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicResponse {
    pub id: Uuid,
    pub topic: String,
}

// -- Feeds --

/// Sparse feed patch. `topic_name` is looked up or created, never a raw
/// topic id from the client.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateFeedRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub topic_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub id: Uuid,
    pub host: Option<UserSummary>,
    pub topic: Option<TopicResponse>,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub created_at: String,
    pub updated_at: String,
    pub comments: Vec<CommentResponse>,
    pub comment_count: usize,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub feed_id: Uuid,
    pub comment_body: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub comment_body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub user_id: Option<Uuid>,
    pub commenter_name: String,
    pub comment_body: String,
    pub created_at: String,
    pub updated_at: String,
}

// -- Public shares --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePublicShareRequest {
    pub feed_id: Uuid,
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PublicShareResponse {
    pub share_token: String,
    pub share_url: String,
    pub expires_at: Option<String>,
}

/// Comment posted through a public share link. `commenter_name` is
/// whatever the visitor typed; it carries no identity guarantee.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvitedCommentRequest {
    pub commenter_name: String,
    pub comment_body: String,
}

// -- User shares --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserShareRequest {
    pub feed_id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ShareAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserShareResponse {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub shared_by: UserSummary,
    pub shared_with: UserSummary,
    pub created_at: String,
}
