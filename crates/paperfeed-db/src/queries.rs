use crate::models::{
    CommentRow, FeedDetailRow, FeedRow, FileShareRow, TopicRow, UserRow, UserShareDetailRow,
    UserShareInsert, UserShareRow,
};
use crate::{Database, now_rfc3339};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let now = now_rfc3339();
            conn.execute(
                "INSERT INTO users (id, username, email, password, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                rusqlite::params![id, username, email, password_hash, now],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    /// Exact, case-sensitive-as-stored email match.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, email, password, is_active, created_at, updated_at
                 FROM users ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Sparse profile patch: absent fields keep their stored value.
    pub fn update_user_profile(
        &self,
        id: &str,
        username: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let now = now_rfc3339();
            conn.execute(
                "UPDATE users SET
                    username = COALESCE(?2, username),
                    email = COALESCE(?3, email),
                    password = COALESCE(?4, password),
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![id, username, email, password_hash, now],
            )?;
            Ok(())
        })
    }

    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Topics --

    pub fn list_topics(&self) -> Result<Vec<TopicRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, topic FROM topics ORDER BY topic")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(TopicRow {
                        id: row.get(0)?,
                        topic: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_topic(&self, id: &str) -> Result<Option<TopicRow>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id, topic FROM topics WHERE id = ?1", [id], |row| {
                Ok(TopicRow {
                    id: row.get(0)?,
                    topic: row.get(1)?,
                })
            })
            .optional()
        })
    }

    /// Returns the existing topic for `label`, inserting it first if
    /// absent.
    pub fn get_or_create_topic(&self, id: &str, label: &str) -> Result<TopicRow> {
        self.with_conn_mut(|conn| get_or_create_topic(conn, id, label))
    }

    pub fn delete_topic(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM topics WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Feeds --

    /// Topic lookup-or-create and feed insert run in one transaction, so
    /// a failed insert leaves no orphaned topic.
    pub fn create_feed(
        &self,
        id: &str,
        host_id: &str,
        topic: Option<(&str, &str)>, // (fresh topic id, label)
        title: &str,
        description: Option<&str>,
        file_path: &str,
        file_name: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let topic_id = match topic {
                Some((tid, label)) => Some(get_or_create_topic(&tx, tid, label)?.id),
                None => None,
            };
            let now = now_rfc3339();
            tx.execute(
                "INSERT INTO feeds (id, host_id, topic_id, title, description, file_path, file_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![id, host_id, topic_id, title, description, file_path, file_name, now],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_feed(&self, id: &str) -> Result<Option<FeedRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, host_id, topic_id, title, description, file_path, file_name, created_at, updated_at
                 FROM feeds WHERE id = ?1",
                [id],
                |row| {
                    Ok(FeedRow {
                        id: row.get(0)?,
                        host_id: row.get(1)?,
                        topic_id: row.get(2)?,
                        title: row.get(3)?,
                        description: row.get(4)?,
                        file_path: row.get(5)?,
                        file_name: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_feed_detail(&self, id: &str) -> Result<Option<FeedDetailRow>> {
        self.with_conn(|conn| {
            let sql = format!("{FEED_DETAIL_SELECT} WHERE f.id = ?1");
            conn.query_row(&sql, [id], map_feed_detail).optional()
        })
    }

    /// Feeds visible to `user_id`: owned by them, or carrying an active
    /// user share for them. The EXISTS predicate yields each feed once
    /// no matter how many grants point at it. `q` filters by title,
    /// description or topic label, case-insensitively.
    pub fn list_visible_feeds(&self, user_id: &str, q: Option<&str>) -> Result<Vec<FeedDetailRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{FEED_DETAIL_SELECT}
                 WHERE (f.host_id = ?1 OR EXISTS (
                        SELECT 1 FROM user_shares us
                        WHERE us.feed_id = f.id
                          AND us.shared_with_id = ?1
                          AND us.is_active = 1))
                   AND (?2 IS NULL
                        OR instr(lower(f.title), lower(?2)) > 0
                        OR instr(lower(COALESCE(f.description, '')), lower(?2)) > 0
                        OR instr(lower(COALESCE(t.topic, '')), lower(?2)) > 0)
                 ORDER BY f.updated_at DESC, f.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, q], map_feed_detail)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Feeds the user holds an active share on (owned feeds excluded
    /// unless also shared, matching the original listing).
    pub fn list_shared_with_me(&self, user_id: &str) -> Result<Vec<FeedDetailRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{FEED_DETAIL_SELECT}
                 WHERE EXISTS (
                        SELECT 1 FROM user_shares us
                        WHERE us.feed_id = f.id
                          AND us.shared_with_id = ?1
                          AND us.is_active = 1)
                 ORDER BY f.updated_at DESC, f.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_feed_detail)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Sparse feed patch; topic lookup-or-create joins the same
    /// transaction as the update.
    pub fn update_feed(
        &self,
        id: &str,
        title: Option<&str>,
        description: Option<&str>,
        topic: Option<(&str, &str)>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let topic_id = match topic {
                Some((tid, label)) => Some(get_or_create_topic(&tx, tid, label)?.id),
                None => None,
            };
            let now = now_rfc3339();
            tx.execute(
                "UPDATE feeds SET
                    title = COALESCE(?2, title),
                    description = COALESCE(?3, description),
                    topic_id = COALESCE(?4, topic_id),
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![id, title, description, topic_id, now],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Cascades to comments, file shares and user shares.
    pub fn delete_feed(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM feeds WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Comments --

    /// Both attribution paths converge here: authenticated comments
    /// carry `user_id` and the author's username snapshot, invited
    /// comments carry no user id and a visitor-typed name.
    pub fn insert_comment(
        &self,
        id: &str,
        feed_id: &str,
        user_id: Option<&str>,
        commenter_name: &str,
        comment_body: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let now = now_rfc3339();
            conn.execute(
                "INSERT INTO comments (id, user_id, feed_id, comment_body, commenter_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id, user_id, feed_id, comment_body, commenter_name, now],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, feed_id, comment_body, commenter_name, created_at, updated_at
                 FROM comments WHERE id = ?1",
                [id],
                map_comment,
            )
            .optional()
        })
    }

    /// Most recently updated first, ties broken by most recently
    /// created. This ordering is part of the API contract.
    pub fn list_comments(&self, feed_id: Option<&str>) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, feed_id, comment_body, commenter_name, created_at, updated_at
                 FROM comments
                 WHERE ?1 IS NULL OR feed_id = ?1
                 ORDER BY updated_at DESC, created_at DESC",
            )?;
            let rows = stmt
                .query_map([feed_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: &str, comment_body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let now = now_rfc3339();
            conn.execute(
                "UPDATE comments SET comment_body = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, comment_body, now],
            )?;
            Ok(())
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Public shares --

    pub fn insert_file_share(
        &self,
        id: &str,
        feed_id: &str,
        share_token: &str,
        created_by: &str,
        created_at: &str,
        expires_at: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO file_shares (id, feed_id, share_token, created_by, created_at, expires_at, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
                rusqlite::params![id, feed_id, share_token, created_by, created_at, expires_at],
            )?;
            Ok(())
        })
    }

    /// Active shares only; a revoked token is indistinguishable from an
    /// unknown one. Expiry is the caller's read-time decision.
    pub fn get_active_file_share_by_token(&self, token: &str) -> Result<Option<FileShareRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, feed_id, share_token, created_by, created_at, expires_at, is_active
                 FROM file_shares WHERE share_token = ?1 AND is_active = 1",
                [token],
                map_file_share,
            )
            .optional()
        })
    }

    pub fn get_file_share(&self, id: &str) -> Result<Option<FileShareRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, feed_id, share_token, created_by, created_at, expires_at, is_active
                 FROM file_shares WHERE id = ?1",
                [id],
                map_file_share,
            )
            .optional()
        })
    }

    /// One-way: there is no reactivation path.
    pub fn deactivate_file_share(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE file_shares SET is_active = 0 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- User shares --

    /// Inserts a fresh active share. The in-transaction check reports an
    /// existing active share as `AlreadyShared`; the partial unique
    /// index closes the race for writers that skipped the check.
    /// Inactive rows are never resurrected.
    pub fn create_user_share(
        &self,
        id: &str,
        feed_id: &str,
        shared_by_id: &str,
        shared_with_id: &str,
    ) -> Result<UserShareInsert> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM user_shares
                     WHERE feed_id = ?1 AND shared_with_id = ?2 AND is_active = 1",
                    [feed_id, shared_with_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Ok(UserShareInsert::AlreadyShared);
            }

            let now = now_rfc3339();
            let inserted = tx.execute(
                "INSERT INTO user_shares (id, feed_id, shared_by_id, shared_with_id, created_at, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                rusqlite::params![id, feed_id, shared_by_id, shared_with_id, now],
            );
            match inserted {
                Ok(_) => {
                    tx.commit()?;
                    Ok(UserShareInsert::Created)
                }
                // Only the partial unique index means "already shared";
                // any other constraint (e.g. an FK on a concurrently
                // deleted feed or user) is a real error.
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(UserShareInsert::AlreadyShared)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn has_active_user_share(&self, feed_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM user_shares
                     WHERE feed_id = ?1 AND shared_with_id = ?2 AND is_active = 1",
                    [feed_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_user_share(&self, id: &str) -> Result<Option<UserShareRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, feed_id, shared_by_id, shared_with_id, created_at, is_active
                 FROM user_shares WHERE id = ?1",
                [id],
                |row| {
                    Ok(UserShareRow {
                        id: row.get(0)?,
                        feed_id: row.get(1)?,
                        shared_by_id: row.get(2)?,
                        shared_with_id: row.get(3)?,
                        created_at: row.get(4)?,
                        is_active: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Idempotent: deactivating an already-inactive share is a no-op
    /// that still succeeds.
    pub fn deactivate_user_share(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE user_shares SET is_active = 0 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn list_active_shares_for_feed(&self, feed_id: &str) -> Result<Vec<UserShareDetailRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.feed_id, s.created_at,
                        sb.id, sb.username, sb.email,
                        sw.id, sw.username, sw.email
                 FROM user_shares s
                 JOIN users sb ON s.shared_by_id = sb.id
                 JOIN users sw ON s.shared_with_id = sw.id
                 WHERE s.feed_id = ?1 AND s.is_active = 1
                 ORDER BY s.created_at",
            )?;
            let rows = stmt
                .query_map([feed_id], |row| {
                    Ok(UserShareDetailRow {
                        id: row.get(0)?,
                        feed_id: row.get(1)?,
                        created_at: row.get(2)?,
                        shared_by_id: row.get(3)?,
                        shared_by_username: row.get(4)?,
                        shared_by_email: row.get(5)?,
                        shared_with_id: row.get(6)?,
                        shared_with_username: row.get(7)?,
                        shared_with_email: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every share row for (feed, recipient), active or not. Used by
    /// tests to assert history is additive.
    pub fn count_user_share_rows(&self, feed_id: &str, user_id: &str) -> Result<(i64, i64)> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(is_active), 0), COUNT(*) FROM user_shares
                 WHERE feed_id = ?1 AND shared_with_id = ?2",
                [feed_id, user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(Into::into)
        })
    }
}

const FEED_DETAIL_SELECT: &str = "
    SELECT f.id, f.host_id, u.username, u.email,
           f.topic_id, t.topic,
           f.title, f.description, f.file_path, f.file_name,
           f.created_at, f.updated_at,
           (SELECT COUNT(*) FROM comments c WHERE c.feed_id = f.id)
    FROM feeds f
    LEFT JOIN users u ON f.host_id = u.id
    LEFT JOIN topics t ON f.topic_id = t.id";

fn map_feed_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedDetailRow> {
    Ok(FeedDetailRow {
        id: row.get(0)?,
        host_id: row.get(1)?,
        host_username: row.get(2)?,
        host_email: row.get(3)?,
        topic_id: row.get(4)?,
        topic_label: row.get(5)?,
        title: row.get(6)?,
        description: row.get(7)?,
        file_path: row.get(8)?,
        file_name: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        comment_count: row.get(12)?,
    })
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        feed_id: row.get(2)?,
        comment_body: row.get(3)?,
        commenter_name: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_file_share(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileShareRow> {
    Ok(FileShareRow {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        share_token: row.get(2)?,
        created_by: row.get(3)?,
        created_at: row.get(4)?,
        expires_at: row.get(5)?,
        is_active: row.get(6)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, password, is_active, created_at, updated_at
         FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

fn get_or_create_topic(conn: &Connection, id: &str, label: &str) -> Result<TopicRow> {
    let existing = conn
        .query_row(
            "SELECT id, topic FROM topics WHERE topic = ?1",
            [label],
            |row| {
                Ok(TopicRow {
                    id: row.get(0)?,
                    topic: row.get(1)?,
                })
            },
        )
        .optional()?;
    if let Some(topic) = existing {
        return Ok(topic);
    }
    conn.execute("INSERT INTO topics (id, topic) VALUES (?1, ?2)", [id, label])?;
    Ok(TopicRow {
        id: id.to_string(),
        topic: label.to_string(),
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, &format!("{username}@example.com"), "hash")
            .unwrap();
        id
    }

    fn add_feed(db: &Database, host_id: &str, title: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_feed(&id, host_id, None, title, None, "uploads/x.pdf", "x.pdf")
            .unwrap();
        id
    }

    fn share(db: &Database, feed: &str, by: &str, with: &str) -> String {
        let id = Uuid::new_v4().to_string();
        match db.create_user_share(&id, feed, by, with).unwrap() {
            UserShareInsert::Created => id,
            UserShareInsert::AlreadyShared => panic!("unexpected duplicate"),
        }
    }

    #[test]
    fn duplicate_active_share_is_rejected() {
        let db = db();
        let owner = add_user(&db, "owner");
        let bob = add_user(&db, "bob");
        let feed = add_feed(&db, &owner, "doc");

        share(&db, &feed, &owner, &bob);
        let second = db
            .create_user_share(&Uuid::new_v4().to_string(), &feed, &owner, &bob)
            .unwrap();
        assert!(matches!(second, UserShareInsert::AlreadyShared));

        let (active, total) = db.count_user_share_rows(&feed, &bob).unwrap();
        assert_eq!(active, 1);
        assert_eq!(total, 1);
    }

    #[test]
    fn share_against_missing_feed_is_an_error_not_a_duplicate() {
        let db = db();
        let owner = add_user(&db, "owner");
        let bob = add_user(&db, "bob");

        // FK failure must surface as an error, not map to AlreadyShared.
        let res = db.create_user_share(
            &Uuid::new_v4().to_string(),
            "no-such-feed",
            &owner,
            &bob,
        );
        assert!(res.is_err());
    }

    #[test]
    fn revoke_then_reshare_inserts_fresh_row() {
        let db = db();
        let owner = add_user(&db, "owner");
        let bob = add_user(&db, "bob");
        let feed = add_feed(&db, &owner, "doc");

        let first = share(&db, &feed, &owner, &bob);
        db.deactivate_user_share(&first).unwrap();
        share(&db, &feed, &owner, &bob);

        let (active, total) = db.count_user_share_rows(&feed, &bob).unwrap();
        assert_eq!(active, 1);
        assert_eq!(total, 2, "history is additive, old row survives");
    }

    #[test]
    fn double_revoke_is_idempotent() {
        let db = db();
        let owner = add_user(&db, "owner");
        let bob = add_user(&db, "bob");
        let feed = add_feed(&db, &owner, "doc");

        let id = share(&db, &feed, &owner, &bob);
        db.deactivate_user_share(&id).unwrap();
        db.deactivate_user_share(&id).unwrap();

        let (active, total) = db.count_user_share_rows(&feed, &bob).unwrap();
        assert_eq!(active, 0);
        assert_eq!(total, 1);
    }

    #[test]
    fn visible_feeds_dedup_and_order() {
        let db = db();
        let owner = add_user(&db, "owner");
        let other = add_user(&db, "other");
        let bob = add_user(&db, "bob");
        let f1 = add_feed(&db, &owner, "first");
        let f2 = add_feed(&db, &other, "second");

        // Two grants from different sharers for the same feed: the
        // partial index allows only one active, so simulate the legacy
        // duplicate with an inactive historical row plus an active one.
        share(&db, &f2, &other, &bob);
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO user_shares (id, feed_id, shared_by_id, shared_with_id, created_at, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                rusqlite::params![Uuid::new_v4().to_string(), f2, owner, bob, now_rfc3339()],
            )?;
            Ok(())
        })
        .unwrap();

        let visible = db.list_visible_feeds(&bob, None).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, f2);

        let owner_view = db.list_visible_feeds(&owner, None).unwrap();
        assert_eq!(owner_view.len(), 1);
        assert_eq!(owner_view[0].id, f1);
    }

    #[test]
    fn search_matches_title_description_topic() {
        let db = db();
        let owner = add_user(&db, "owner");
        let tid = Uuid::new_v4().to_string();
        let fid = Uuid::new_v4().to_string();
        db.create_feed(
            &fid,
            &owner,
            Some((&tid, "Rust")),
            "Ownership Notes",
            Some("borrow checker deep dive"),
            "uploads/a.pdf",
            "a.pdf",
        )
        .unwrap();

        assert_eq!(db.list_visible_feeds(&owner, Some("ownership")).unwrap().len(), 1);
        assert_eq!(db.list_visible_feeds(&owner, Some("BORROW")).unwrap().len(), 1);
        assert_eq!(db.list_visible_feeds(&owner, Some("rust")).unwrap().len(), 1);
        assert_eq!(db.list_visible_feeds(&owner, Some("python")).unwrap().len(), 0);
    }

    #[test]
    fn comment_order_is_updated_then_created_desc() {
        let db = db();
        let owner = add_user(&db, "owner");
        let feed = add_feed(&db, &owner, "doc");

        // (created_at, updated_at) pairs from the ordering contract,
        // inserted out of order.
        let t1 = "2025-01-01T00:00:00.000000Z";
        let t2 = "2025-01-02T00:00:00.000000Z";
        let t3 = "2025-01-03T00:00:00.000000Z";
        let rows = [("c", t3, t3), ("a", t1, t1), ("b", t1, t2)];
        for (id, created, updated) in rows {
            db.with_conn_mut(|conn| {
                conn.execute(
                    "INSERT INTO comments (id, user_id, feed_id, comment_body, commenter_name, created_at, updated_at)
                     VALUES (?1, NULL, ?2, 'body', 'anon', ?3, ?4)",
                    rusqlite::params![id, feed, created, updated],
                )?;
                Ok(())
            })
            .unwrap();
        }

        let listed = db.list_comments(Some(&feed)).unwrap();
        let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn deleting_feed_cascades_comments_and_shares() {
        let db = db();
        let owner = add_user(&db, "owner");
        let bob = add_user(&db, "bob");
        let feed = add_feed(&db, &owner, "doc");

        db.insert_comment(&Uuid::new_v4().to_string(), &feed, Some(&owner), "owner", "hi")
            .unwrap();
        share(&db, &feed, &owner, &bob);
        db.insert_file_share(
            &Uuid::new_v4().to_string(),
            &feed,
            "token-abc",
            &owner,
            &now_rfc3339(),
            None,
        )
        .unwrap();

        assert!(db.delete_feed(&feed).unwrap());

        assert!(db.list_comments(Some(&feed)).unwrap().is_empty());
        assert!(db.get_active_file_share_by_token("token-abc").unwrap().is_none());
        let (_, total) = db.count_user_share_rows(&feed, &bob).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn deleting_topic_detaches_feeds() {
        let db = db();
        let owner = add_user(&db, "owner");
        let tid = Uuid::new_v4().to_string();
        let fid = Uuid::new_v4().to_string();
        db.create_feed(&fid, &owner, Some((&tid, "rust")), "doc", None, "p", "n")
            .unwrap();

        let topic = db.get_or_create_topic(&Uuid::new_v4().to_string(), "rust").unwrap();
        assert!(db.delete_topic(&topic.id).unwrap());

        let feed = db.get_feed(&fid).unwrap().unwrap();
        assert!(feed.topic_id.is_none(), "feed survives with topic detached");
    }

    #[test]
    fn deleting_user_detaches_feeds_and_comments_but_kills_shares() {
        let db = db();
        let owner = add_user(&db, "owner");
        let bob = add_user(&db, "bob");
        let feed = add_feed(&db, &bob, "bobs-doc");
        db.insert_comment(&Uuid::new_v4().to_string(), &feed, Some(&bob), "bob", "mine")
            .unwrap();
        share(&db, &feed, &bob, &owner);
        db.insert_file_share(
            &Uuid::new_v4().to_string(),
            &feed,
            "bobs-token",
            &bob,
            &now_rfc3339(),
            None,
        )
        .unwrap();

        assert!(db.delete_user(&bob).unwrap());

        // Feed is detached, not deleted; existing comments keep their
        // text with attribution cleared.
        let row = db.get_feed(&feed).unwrap().unwrap();
        assert!(row.host_id.is_none());
        let comments = db.list_comments(Some(&feed)).unwrap();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].user_id.is_none());

        // Shares created by the deleted user cascade away.
        assert!(db.get_active_file_share_by_token("bobs-token").unwrap().is_none());
        let (_, total) = db.count_user_share_rows(&feed, &owner).unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn topic_get_or_create_reuses_existing() {
        let db = db();
        let a = db.get_or_create_topic(&Uuid::new_v4().to_string(), "rust").unwrap();
        let b = db.get_or_create_topic(&Uuid::new_v4().to_string(), "rust").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(db.list_topics().unwrap().len(), 1);
    }

    #[test]
    fn profile_patch_only_touches_provided_fields() {
        let db = db();
        let id = add_user(&db, "carol");
        db.update_user_profile(&id, None, Some("new@example.com"), None).unwrap();

        let row = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(row.username, "carol");
        assert_eq!(row.email, "new@example.com");
        assert_eq!(row.password, "hash");
    }
}
