/// Database row types — these map directly to SQLite rows.
/// Distinct from the paperfeed-types API models to keep the DB layer
/// independent of the wire format.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct TopicRow {
    pub id: String,
    pub topic: String,
}

#[derive(Debug)]
pub struct FeedRow {
    pub id: String,
    pub host_id: Option<String>,
    pub topic_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub file_path: String,
    pub file_name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Feed joined with its host, topic and comment count, as the listing
/// endpoints return it.
pub struct FeedDetailRow {
    pub id: String,
    pub host_id: Option<String>,
    pub host_username: Option<String>,
    pub host_email: Option<String>,
    pub topic_id: Option<String>,
    pub topic_label: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub file_path: String,
    pub file_name: String,
    pub created_at: String,
    pub updated_at: String,
    pub comment_count: i64,
}

pub struct CommentRow {
    pub id: String,
    pub user_id: Option<String>,
    pub feed_id: String,
    pub comment_body: String,
    pub commenter_name: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct FileShareRow {
    pub id: String,
    pub feed_id: String,
    pub share_token: String,
    pub created_by: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub is_active: bool,
}

pub struct UserShareRow {
    pub id: String,
    pub feed_id: String,
    pub shared_by_id: String,
    pub shared_with_id: String,
    pub created_at: String,
    pub is_active: bool,
}

/// User share with both participant identities resolved, for the
/// owner-facing share listing.
pub struct UserShareDetailRow {
    pub id: String,
    pub feed_id: String,
    pub created_at: String,
    pub shared_by_id: String,
    pub shared_by_username: String,
    pub shared_by_email: String,
    pub shared_with_id: String,
    pub shared_with_username: String,
    pub shared_with_email: String,
}

/// Outcome of a user-share insert: the active-duplicate case is a
/// first-class result, not an error string.
pub enum UserShareInsert {
    Created,
    AlreadyShared,
}
