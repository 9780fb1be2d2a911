use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use warbler_db::models::MessageWithAuthorRow;

use crate::auth::{AppState, with_db};
use crate::error::AppError;
use crate::params::RowId;
use crate::session::{AuthContext, CurrentUser, expired_session_cookie};
use crate::views;

/// Most messages rendered on the home feed or a profile.
const PAGE_LIMIT: u32 = 100;

/// GET /
///
/// Landing page, or the viewer's feed when signed in.
pub async fn homepage(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Html<String>, AppError> {
    let AuthContext::User(user) = auth else {
        return Ok(Html(views::home_anon()));
    };

    let user_id = user.id;
    let (feed, liked) = with_db(&state, move |db| {
        let feed = db.get_feed(user_id, PAGE_LIMIT)?;
        let liked: Vec<i64> = db
            .get_likes_by_user(user_id)?
            .into_iter()
            .map(|like| like.message_id)
            .collect();
        Ok((feed, liked))
    })
    .await?;

    let feed: Vec<_> = feed.iter().map(MessageWithAuthorRow::to_view).collect();
    Ok(Html(views::home_feed(&user.to_public(), &feed, &liked)))
}

/// GET /users/{user_id}
///
/// Public profile with the user's messages.
pub async fn show_user(
    State(state): State<AppState>,
    auth: AuthContext,
    RowId(user_id): RowId,
) -> Result<Html<String>, AppError> {
    let viewer_id = auth.user().map(|u| u.id);
    let found = with_db(&state, move |db| {
        let Some(user) = db.get_user_by_id(user_id)? else {
            return Ok(None);
        };
        let stats = db.get_user_stats(user_id)?;
        let messages = db.get_messages_by_user(user_id, PAGE_LIMIT)?;
        let is_following = match viewer_id {
            Some(viewer_id) => db.is_following(viewer_id, user_id)?,
            None => false,
        };
        Ok(Some((user, stats, messages, is_following)))
    })
    .await?;

    let (user, stats, messages, is_following) = found.ok_or(AppError::NotFound)?;
    let messages: Vec<_> = messages.iter().map(MessageWithAuthorRow::to_view).collect();
    Ok(Html(views::profile(
        auth.viewer().as_ref(),
        &user.to_public(),
        &stats,
        &messages,
        is_following,
    )))
}

/// POST /users/delete
///
/// Removes the signed-in user and everything they own.
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.id;
    with_db(&state, move |db| db.delete_user(user_id)).await?;
    info!(user_id, "User deleted");

    Ok((jar.remove(expired_session_cookie()), views::found("/signup")))
}
