use paperfeed_db::Database;
use paperfeed_db::models::FeedRow;

use crate::error::{ApiError, ApiResult};

/// Ownership is the only write authorization. A feed whose host was
/// deleted has no owner and therefore no authorized modifier.
pub fn is_owner(host_id: Option<&str>, user_id: &str) -> bool {
    host_id == Some(user_id)
}

/// Read access: owner, or holder of an active user share. One predicate
/// for single reads and listings alike.
pub fn can_access(
    db: &Database,
    feed_id: &str,
    host_id: Option<&str>,
    user_id: &str,
) -> anyhow::Result<bool> {
    if is_owner(host_id, user_id) {
        return Ok(true);
    }
    db.has_active_user_share(feed_id, user_id)
}

/// Missing feeds are NotFound; authorization failures on existing feeds
/// are the caller's Forbidden to raise.
pub fn load_feed(db: &Database, feed_id: &str) -> ApiResult<FeedRow> {
    db.get_feed(feed_id)?
        .ok_or(ApiError::NotFound("Feed not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn setup() -> (Database, String, String, String) {
        let db = Database::open_in_memory().unwrap();
        let owner = Uuid::new_v4().to_string();
        let bob = Uuid::new_v4().to_string();
        db.create_user(&owner, "owner", "owner@example.com", "hash").unwrap();
        db.create_user(&bob, "bob", "bob@example.com", "hash").unwrap();
        let feed = Uuid::new_v4().to_string();
        db.create_feed(&feed, &owner, None, "doc", None, "uploads/d.pdf", "d.pdf")
            .unwrap();
        (db, owner, bob, feed)
    }

    #[test]
    fn owner_can_access_and_modify() {
        let (db, owner, _, feed) = setup();
        assert!(is_owner(Some(&owner), &owner));
        assert!(can_access(&db, &feed, Some(&owner), &owner).unwrap());
    }

    #[test]
    fn stranger_has_no_access() {
        let (db, owner, bob, feed) = setup();
        assert!(!is_owner(Some(&owner), &bob));
        assert!(!can_access(&db, &feed, Some(&owner), &bob).unwrap());
    }

    #[test]
    fn active_share_grants_read_but_not_write() {
        let (db, owner, bob, feed) = setup();
        db.create_user_share(&Uuid::new_v4().to_string(), &feed, &owner, &bob)
            .unwrap();
        assert!(can_access(&db, &feed, Some(&owner), &bob).unwrap());
        assert!(!is_owner(Some(&owner), &bob));
    }

    #[test]
    fn revoked_share_grants_nothing() {
        let (db, owner, bob, feed) = setup();
        let sid = Uuid::new_v4().to_string();
        db.create_user_share(&sid, &feed, &owner, &bob).unwrap();
        db.deactivate_user_share(&sid).unwrap();
        assert!(!can_access(&db, &feed, Some(&owner), &bob).unwrap());
    }

    #[test]
    fn ownerless_feed_is_readable_via_share_only() {
        let (db, owner, bob, feed) = setup();
        db.create_user_share(&Uuid::new_v4().to_string(), &feed, &owner, &bob)
            .unwrap();
        db.delete_user(&owner).unwrap();

        let row = db.get_feed(&feed).unwrap().unwrap();
        assert!(row.host_id.is_none());
        // Nobody can modify an ownerless feed.
        assert!(!is_owner(row.host_id.as_deref(), &bob));
        // Bob's share came from the owner (shared_by cascades), so his
        // access is gone too; a share from a surviving user would hold.
        assert!(!can_access(&db, &feed, None, &bob).unwrap());
    }

    #[test]
    fn missing_feed_is_not_found() {
        let (db, ..) = setup();
        let err = load_feed(&db, &Uuid::new_v4().to_string()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
