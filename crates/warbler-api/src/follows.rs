use axum::{
    extract::State,
    response::{Html, Response},
};
use tracing::info;

use warbler_db::Database;
use warbler_db::models::UserRow;
use warbler_types::models::User;

use crate::auth::{AppState, with_db};
use crate::error::AppError;
use crate::params::RowId;
use crate::session::CurrentUser;
use crate::views;

/// POST /users/follow/{user_id}
pub async fn follow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RowId(target_id): RowId,
) -> Result<Response, AppError> {
    let user_id = user.id;
    let followed = with_db(&state, move |db| {
        if db.get_user_by_id(target_id)?.is_none() {
            return Ok(None);
        }
        db.follow(user_id, target_id).map(Some)
    })
    .await?
    .ok_or(AppError::NotFound)?;

    info!(user_id, target_id, followed, "Follow");
    Ok(views::found(&format!("/users/{}/following", user_id)))
}

/// POST /users/stop-following/{user_id}
pub async fn stop_following(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RowId(target_id): RowId,
) -> Result<Response, AppError> {
    let user_id = user.id;
    let removed = with_db(&state, move |db| {
        if db.get_user_by_id(target_id)?.is_none() {
            return Ok(None);
        }
        db.unfollow(user_id, target_id).map(Some)
    })
    .await?
    .ok_or(AppError::NotFound)?;

    info!(user_id, target_id, removed, "Unfollow");
    Ok(views::found(&format!("/users/{}/following", user_id)))
}

/// GET /users/{user_id}/following
pub async fn show_following(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    RowId(user_id): RowId,
) -> Result<Html<String>, AppError> {
    let (owner, users) = load_listing(&state, user_id, |db, id| db.get_following(id)).await?;
    Ok(Html(views::user_list(&viewer.to_public(), &owner, "Following", &users)))
}

/// GET /users/{user_id}/followers
pub async fn show_followers(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    RowId(user_id): RowId,
) -> Result<Html<String>, AppError> {
    let (owner, users) = load_listing(&state, user_id, |db, id| db.get_followers(id)).await?;
    Ok(Html(views::user_list(&viewer.to_public(), &owner, "Followers", &users)))
}

async fn load_listing<F>(
    state: &AppState,
    user_id: i64,
    list: F,
) -> Result<(User, Vec<User>), AppError>
where
    F: FnOnce(&Database, i64) -> anyhow::Result<Vec<UserRow>> + Send + 'static,
{
    let found = with_db(state, move |db| {
        let Some(owner) = db.get_user_by_id(user_id)? else {
            return Ok(None);
        };
        Ok(Some((owner, list(db, user_id)?)))
    })
    .await?;

    let (owner, users) = found.ok_or(AppError::NotFound)?;
    Ok((owner.to_public(), users.iter().map(UserRow::to_public).collect()))
}
