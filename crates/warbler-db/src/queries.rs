use crate::Database;
use crate::models::{
    DeleteOutcome, LikeOutcome, LikeRow, MessageRow, MessageWithAuthorRow, NewMessage, NewUser, UserRow,
    UserStats,
};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, Row};

const USER_COLUMNS: &str =
    "id, email, username, image_url, header_image_url, bio, location, password";

impl Database {
    // -- Users --

    /// Insert a user. `password_hash` must already be hashed; this layer
    /// never sees plaintext passwords.
    pub fn create_user(&self, new: &NewUser<'_>, password_hash: &str) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, username, image_url, password) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![new.id, new.email, new.username, new.image_url, password_hash],
            )?;
            let id = conn.last_insert_rowid();
            query_user_by_id(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", id))
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
            conn.query_row(&sql, [username], user_from_row).optional()
        })
    }

    /// Delete a user. Messages, likes and follows go with it via cascade.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn get_user_stats(&self, id: i64) -> Result<UserStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM messages WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_following_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1),
                    (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
                [id],
                |row| {
                    Ok(UserStats {
                        messages: row.get(0)?,
                        following: row.get(1)?,
                        followers: row.get(2)?,
                        likes: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, new: &NewMessage<'_>) -> Result<MessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, text, user_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![new.id, new.text, new.user_id],
            )?;
            let id = conn.last_insert_rowid();
            query_message(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Message {} vanished after insert", id))
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// A user's own messages, newest first.
    pub fn get_messages_by_user(&self, user_id: i64, limit: u32) -> Result<Vec<MessageWithAuthorRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 WHERE m.user_id = ?1
                 ORDER BY m.timestamp DESC, m.id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], message_with_author_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Messages written by the user or by anyone they follow, newest first.
    pub fn get_feed(&self, user_id: i64, limit: u32) -> Result<Vec<MessageWithAuthorRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 WHERE m.user_id = ?1
                    OR m.user_id IN (
                        SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1
                    )
                 ORDER BY m.timestamp DESC, m.id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], message_with_author_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete a message only if `user_id` owns it. The ownership check and
    /// the delete share one transaction.
    pub fn delete_message_owned(&self, message_id: i64, user_id: i64) -> Result<DeleteOutcome> {
        self.with_tx(|tx| {
            let owner: Option<i64> = tx
                .query_row("SELECT user_id FROM messages WHERE id = ?1", [message_id], |row| {
                    row.get(0)
                })
                .optional()?;

            match owner {
                None => Ok(DeleteOutcome::NotFound),
                Some(owner) if owner != user_id => Ok(DeleteOutcome::NotOwner),
                Some(_) => {
                    tx.execute(
                        "DELETE FROM messages WHERE id = ?1 AND user_id = ?2",
                        [message_id, user_id],
                    )?;
                    Ok(DeleteOutcome::Deleted)
                }
            }
        })
    }

    // -- Likes --

    /// Record a like. Returns false when the pair already existed.
    pub fn add_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO likes (user_id, message_id) VALUES (?1, ?2)",
                [user_id, message_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Toggle a like: removes if it exists, inserts if not.
    /// Returns true when the like was added.
    pub fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        self.with_tx(|tx| {
            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                [user_id, message_id],
            )?;
            if removed > 0 {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                [user_id, message_id],
            )?;
            Ok(true)
        })
    }

    /// Toggle `user_id`'s like on a message they do not own. The message
    /// lookup, the owner check and the toggle share one transaction.
    pub fn like_message(&self, user_id: i64, message_id: i64) -> Result<LikeOutcome> {
        self.with_tx(|tx| {
            let owner: Option<i64> = tx
                .query_row("SELECT user_id FROM messages WHERE id = ?1", [message_id], |row| {
                    row.get(0)
                })
                .optional()?;

            match owner {
                None => Ok(LikeOutcome::NotFound),
                Some(owner) if owner == user_id => Ok(LikeOutcome::OwnMessage),
                Some(_) => {
                    let removed = tx.execute(
                        "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                        [user_id, message_id],
                    )?;
                    if removed > 0 {
                        return Ok(LikeOutcome::Removed);
                    }
                    tx.execute(
                        "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                        [user_id, message_id],
                    )?;
                    Ok(LikeOutcome::Added)
                }
            }
        })
    }

    pub fn get_likes_by_user(&self, user_id: i64) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, user_id, message_id FROM likes WHERE user_id = ?1 ORDER BY id")?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(LikeRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message_id: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Messages the user liked, most recently liked first.
    pub fn get_liked_messages(&self, user_id: i64) -> Result<Vec<MessageWithAuthorRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url
                 FROM likes l
                 JOIN messages m ON l.message_id = m.id
                 JOIN users u ON m.user_id = u.id
                 WHERE l.user_id = ?1
                 ORDER BY l.id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], message_with_author_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follows --

    /// Start following. Returns false when already following.
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO follows (user_being_followed_id, user_following_id) VALUES (?1, ?2)",
                [followed_id, follower_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Stop following. Returns false when there was nothing to remove.
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                [followed_id, follower_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                    [followed_id, follower_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Users that `user_id` follows.
    pub fn get_following(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "JOIN follows f ON f.user_being_followed_id = u.id WHERE f.user_following_id = ?1",
                user_id,
            )
        })
    }

    /// Users following `user_id`.
    pub fn get_followers(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "JOIN follows f ON f.user_following_id = u.id WHERE f.user_being_followed_id = ?1",
                user_id,
            )
        })
    }
}

/// True when `err` came from a UNIQUE or PRIMARY KEY constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        image_url: row.get(3)?,
        header_image_url: row.get(4)?,
        bio: row.get(5)?,
        location: row.get(6)?,
        password: row.get(7)?,
    })
}

fn message_with_author_from_row(row: &Row<'_>) -> rusqlite::Result<MessageWithAuthorRow> {
    Ok(MessageWithAuthorRow {
        message: MessageRow {
            id: row.get(0)?,
            text: row.get(1)?,
            timestamp: row.get(2)?,
            user_id: row.get(3)?,
        },
        author_username: row.get(4)?,
        author_image_url: row.get(5)?,
    })
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id], user_from_row).optional()
}

fn query_users(conn: &Connection, join_and_filter: &str, user_id: i64) -> Result<Vec<UserRow>> {
    let sql = format!(
        "SELECT u.id, u.email, u.username, u.image_url, u.header_image_url, u.bio, u.location, u.password
         FROM users u {join_and_filter}
         ORDER BY u.username"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([user_id], user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    conn.query_row(
        "SELECT id, text, timestamp, user_id FROM messages WHERE id = ?1",
        [id],
        |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                text: row.get(1)?,
                timestamp: row.get(2)?,
                user_id: row.get(3)?,
            })
        },
    )
    .optional()
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

    fn seed_user(db: &Database, id: i64, username: &str) -> UserRow {
        let email = format!("{username}@test.com");
        db.create_user(
            &NewUser {
                id: Some(id),
                username,
                email: &email,
                image_url: None,
            },
            "not-a-real-hash",
        )
        .unwrap()
    }

    fn seed_message(db: &Database, text: &str, user_id: i64) -> MessageRow {
        db.insert_message(&NewMessage {
            id: None,
            text,
            user_id,
        })
        .unwrap()
    }

    #[test]
    fn message_belongs_to_user() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 94566, "testing");

        seed_message(&db, "a warble", 94566);

        let messages = db.get_messages_by_user(94566, 100).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message.text, "a warble");
        assert_eq!(messages[0].author_username, "testing");
    }

    #[test]
    fn like_creates_one_row() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 94566, "testing");
        let m1 = seed_message(&db, "a warble", 94566);
        seed_message(&db, "a very interesting warble", 94566);
        seed_user(&db, 888, "yetanothertest");

        assert!(db.add_like(888, m1.id).unwrap());

        let likes = db.get_likes_by_user(888).unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].message_id, m1.id);
    }

    #[test]
    fn repeated_like_is_ignored() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "author");
        seed_user(&db, 2, "fan");
        let m = seed_message(&db, "hi", 1);

        assert!(db.add_like(2, m.id).unwrap());
        assert!(!db.add_like(2, m.id).unwrap());
        assert_eq!(db.get_likes_by_user(2).unwrap().len(), 1);
    }

    #[test]
    fn toggle_like_adds_then_removes() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "author");
        seed_user(&db, 2, "fan");
        let m = seed_message(&db, "hi", 1);

        assert!(db.toggle_like(2, m.id).unwrap());
        assert_eq!(db.get_liked_messages(2).unwrap().len(), 1);
        assert!(!db.toggle_like(2, m.id).unwrap());
        assert!(db.get_likes_by_user(2).unwrap().is_empty());
    }

    #[test]
    fn like_message_checks_message_and_owner() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "author");
        seed_user(&db, 2, "fan");
        let m = seed_message(&db, "hi", 1);

        assert_eq!(db.like_message(1, m.id).unwrap(), LikeOutcome::OwnMessage);
        assert_eq!(db.like_message(2, 9999).unwrap(), LikeOutcome::NotFound);
        assert!(db.get_likes_by_user(2).unwrap().is_empty());

        assert_eq!(db.like_message(2, m.id).unwrap(), LikeOutcome::Added);
        assert_eq!(db.get_likes_by_user(2).unwrap().len(), 1);
        assert_eq!(db.like_message(2, m.id).unwrap(), LikeOutcome::Removed);
        assert!(db.get_likes_by_user(2).unwrap().is_empty());
    }

    #[test]
    fn like_message_after_delete_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "author");
        seed_user(&db, 2, "fan");
        let m = seed_message(&db, "short lived", 1);
        assert_eq!(db.delete_message_owned(m.id, 1).unwrap(), DeleteOutcome::Deleted);

        assert_eq!(db.like_message(2, m.id).unwrap(), LikeOutcome::NotFound);
    }

    #[test]
    fn message_requires_existing_user() {
        let db = Database::open_in_memory().unwrap();
        let result = db.insert_message(&NewMessage {
            id: None,
            text: "orphan",
            user_id: 424242,
        });
        assert!(result.is_err());
    }

    #[test]
    fn message_text_is_bounded() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "author");
        let long = "x".repeat(141);

        assert!(db
            .insert_message(&NewMessage { id: None, text: &long, user_id: 1 })
            .is_err());
        assert!(db
            .insert_message(&NewMessage { id: None, text: "", user_id: 1 })
            .is_err());
    }

    #[test]
    fn delete_checks_owner() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 8989, "owner");
        seed_user(&db, 76543, "other");
        db.insert_message(&NewMessage { id: Some(1234), text: "mine", user_id: 8989 })
            .unwrap();

        assert_eq!(db.delete_message_owned(1234, 76543).unwrap(), DeleteOutcome::NotOwner);
        assert!(db.get_message(1234).unwrap().is_some());

        assert_eq!(db.delete_message_owned(9999, 8989).unwrap(), DeleteOutcome::NotFound);

        assert_eq!(db.delete_message_owned(1234, 8989).unwrap(), DeleteOutcome::Deleted);
        assert!(db.get_message(1234).unwrap().is_none());
    }

    #[test]
    fn follow_pair_is_unique() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "alice");
        seed_user(&db, 2, "bob");

        assert!(db.follow(1, 2).unwrap());
        assert!(!db.follow(1, 2).unwrap());
        assert!(db.is_following(1, 2).unwrap());
        assert!(!db.is_following(2, 1).unwrap());

        let following = db.get_following(1).unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].username, "bob");
        let followers = db.get_followers(2).unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username, "alice");

        assert!(db.unfollow(1, 2).unwrap());
        assert!(!db.unfollow(1, 2).unwrap());
    }

    #[test]
    fn feed_contains_own_and_followed_messages() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "alice");
        seed_user(&db, 2, "bob");
        seed_user(&db, 3, "carol");
        seed_message(&db, "from alice", 1);
        seed_message(&db, "from bob", 2);
        seed_message(&db, "from carol", 3);
        db.follow(1, 2).unwrap();

        let feed = db.get_feed(1, 100).unwrap();
        let texts: Vec<&str> = feed.iter().map(|m| m.message.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains(&"from alice"));
        assert!(texts.contains(&"from bob"));
        assert!(!texts.contains(&"from carol"));
    }

    #[test]
    fn deleting_user_cascades() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "alice");
        seed_user(&db, 2, "bob");
        let m = seed_message(&db, "alice says", 1);
        db.add_like(2, m.id).unwrap();
        db.follow(2, 1).unwrap();

        assert!(db.delete_user(1).unwrap());

        assert!(db.get_message(m.id).unwrap().is_none());
        assert!(db.get_likes_by_user(2).unwrap().is_empty());
        assert!(db.get_following(2).unwrap().is_empty());
        let stats = db.get_user_stats(2).unwrap();
        assert_eq!(stats.likes, 0);
        assert_eq!(stats.following, 0);
    }

    #[test]
    fn duplicate_username_is_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "alice");

        let err = db
            .create_user(
                &NewUser {
                    id: None,
                    username: "alice",
                    email: "other@test.com",
                    image_url: None,
                },
                "hash",
            )
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn user_stats_count_relations() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 1, "alice");
        seed_user(&db, 2, "bob");
        let m = seed_message(&db, "one", 2);
        seed_message(&db, "two", 1);
        db.follow(1, 2).unwrap();
        db.add_like(1, m.id).unwrap();

        let stats = db.get_user_stats(1).unwrap();
        assert_eq!(stats.messages, 1);
        assert_eq!(stats.following, 1);
        assert_eq!(stats.followers, 0);
        assert_eq!(stats.likes, 1);
    }
}
