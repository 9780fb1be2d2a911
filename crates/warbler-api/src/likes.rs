use axum::{
    extract::State,
    response::{Html, Response},
};
use tracing::{info, warn};

use warbler_db::models::{LikeOutcome, MessageWithAuthorRow};

use crate::auth::{AppState, with_db};
use crate::error::AppError;
use crate::params::RowId;
use crate::session::CurrentUser;
use crate::views;

/// POST /users/add_like/{message_id}
///
/// Likes the message, or unlikes it if already liked. Users cannot like their own messages.
pub async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RowId(message_id): RowId,
) -> Result<Response, AppError> {
    let user_id = user.id;
    match with_db(&state, move |db| db.like_message(user_id, message_id)).await? {
        LikeOutcome::Added => info!(message_id, user_id, "Message liked"),
        LikeOutcome::Removed => info!(message_id, user_id, "Like removed"),
        LikeOutcome::NotFound => return Err(AppError::NotFound),
        LikeOutcome::OwnMessage => {
            warn!(message_id, user_id, "Refused like on own message");
            return Err(AppError::Unauthorized);
        }
    }

    Ok(views::found("/"))
}

/// GET /users/{user_id}/likes
pub async fn show_likes(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    RowId(user_id): RowId,
) -> Result<Html<String>, AppError> {
    let viewer_id = viewer.id;
    let found = with_db(&state, move |db| {
        let Some(owner) = db.get_user_by_id(user_id)? else {
            return Ok(None);
        };
        let messages = db.get_liked_messages(user_id)?;
        let viewer_likes: Vec<i64> = db
            .get_likes_by_user(viewer_id)?
            .into_iter()
            .map(|like| like.message_id)
            .collect();
        Ok(Some((owner, messages, viewer_likes)))
    })
    .await?;

    let (owner, messages, viewer_likes) = found.ok_or(AppError::NotFound)?;
    let messages: Vec<_> = messages.iter().map(MessageWithAuthorRow::to_view).collect();
    Ok(Html(views::liked_messages(
        &viewer.to_public(),
        &owner.to_public(),
        &messages,
        &viewer_likes,
    )))
}
