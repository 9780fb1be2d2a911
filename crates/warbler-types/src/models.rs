use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image shown for users that signed up without one.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";

/// Header image shown for users that never set one.
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// Maximum length of a message, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;

/// Maximum length of a username, in characters.
pub const MAX_USERNAME_LEN: usize = 20;

/// A user as shown to other users. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
}

/// A message together with the author fields needed to render it in a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub message: Message,
    pub author_username: String,
    pub author_image_url: String,
}

/// Parse a timestamp as written by SQLite's `datetime('now')`.
///
/// SQLite stores "YYYY-MM-DD HH:MM:SS" without a timezone; the value is UTC.
/// RFC 3339 strings are accepted too.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_datetime() {
        let ts = parse_timestamp("2024-03-05 17:04:09").unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.day(), 5);
        assert_eq!(ts.hour(), 17);
    }

    #[test]
    fn parses_rfc3339() {
        assert!(parse_timestamp("2024-03-05T17:04:09Z").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }
}
