//! Database row types. These map directly to SQLite rows and stay separate
//! from the warbler-types models so the storage layer owns its own shape.

use warbler_types::models::{
    DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, Message, MessageView, User, parse_timestamp,
};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub password: String,
}

impl UserRow {
    pub fn to_public(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            image_url: self
                .image_url
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
            header_image_url: self
                .header_image_url
                .clone()
                .unwrap_or_else(|| DEFAULT_HEADER_IMAGE_URL.to_string()),
            bio: self.bio.clone(),
            location: self.location.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub text: String,
    pub timestamp: String,
    pub user_id: i64,
}

impl MessageRow {
    pub fn to_public(&self) -> Message {
        Message {
            id: self.id,
            text: self.text.clone(),
            timestamp: parse_timestamp(&self.timestamp).unwrap_or_else(|| {
                tracing::warn!("Corrupt timestamp '{}' on message {}", self.timestamp, self.id);
                chrono::DateTime::default()
            }),
            user_id: self.user_id,
        }
    }
}

/// A message joined with its author's display fields.
#[derive(Debug, Clone)]
pub struct MessageWithAuthorRow {
    pub message: MessageRow,
    pub author_username: String,
    pub author_image_url: Option<String>,
}

impl MessageWithAuthorRow {
    pub fn to_view(&self) -> MessageView {
        MessageView {
            message: self.message.to_public(),
            author_username: self.author_username.clone(),
            author_image_url: self
                .author_image_url
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LikeRow {
    pub id: i64,
    pub user_id: i64,
    pub message_id: i64,
}

/// Insert payload for `users`. `id` is chosen by SQLite when `None`.
#[derive(Debug, Clone, Default)]
pub struct NewUser<'a> {
    pub id: Option<i64>,
    pub username: &'a str,
    pub email: &'a str,
    pub image_url: Option<&'a str>,
}

/// Insert payload for `messages`. `id` is chosen by SQLite when `None`.
#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub id: Option<i64>,
    pub text: &'a str,
    pub user_id: i64,
}

/// Result of an owner-checked delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    NotOwner,
}

/// Result of liking a message as a given user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Added,
    Removed,
    NotFound,
    OwnMessage,
}

/// Counters shown on a profile page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub messages: i64,
    pub following: i64,
    pub followers: i64,
    pub likes: i64,
}
