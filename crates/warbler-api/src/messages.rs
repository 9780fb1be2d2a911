use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::{info, warn};

use warbler_db::models::{DeleteOutcome, NewMessage};
use warbler_types::api::MessageForm;
use warbler_types::models::MAX_MESSAGE_LEN;

use crate::auth::{AppState, with_db};
use crate::error::AppError;
use crate::params::RowId;
use crate::session::CurrentUser;
use crate::views;

/// GET /messages/new
pub async fn new_message_form(CurrentUser(user): CurrentUser) -> Html<String> {
    Html(views::new_message_form(&user.to_public(), None, ""))
}

/// POST /messages/new
///
/// The author is always the session user.
pub async fn create_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let text = form.text.trim().to_string();
    let problem = if text.is_empty() {
        Some("Message text is required.")
    } else if text.chars().count() > MAX_MESSAGE_LEN {
        Some("Messages are limited to 140 characters.")
    } else {
        None
    };
    if let Some(problem) = problem {
        let page = views::new_message_form(&user.to_public(), Some(problem), &form.text);
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
    }

    let user_id = user.id;
    let message = with_db(&state, move |db| {
        db.insert_message(&NewMessage {
            id: None,
            text: &text,
            user_id,
        })
    })
    .await?;

    info!(message_id = message.id, user_id, "Message created");
    Ok(views::found(&format!("/users/{}", user_id)))
}

/// GET /messages/{message_id}
///
/// Any signed-in user may view any message.
pub async fn show_message(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    RowId(message_id): RowId,
) -> Result<Html<String>, AppError> {
    let found = with_db(&state, move |db| {
        let Some(message) = db.get_message(message_id)? else {
            return Ok(None);
        };
        let author = db.get_user_by_id(message.user_id)?;
        Ok(author.map(|author| (message, author)))
    })
    .await?;

    let (message, author) = found.ok_or(AppError::NotFound)?;
    Ok(Html(views::message_detail(
        &viewer.to_public(),
        &message.to_public(),
        &author.to_public(),
    )))
}

/// POST /messages/{message_id}/delete
///
/// Owner only.
pub async fn delete_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RowId(message_id): RowId,
) -> Result<Response, AppError> {
    let user_id = user.id;
    let outcome = with_db(&state, move |db| db.delete_message_owned(message_id, user_id)).await?;

    match outcome {
        DeleteOutcome::Deleted => {
            info!(message_id, user_id, "Message deleted");
            Ok(views::found(&format!("/users/{}", user_id)))
        }
        DeleteOutcome::NotOwner => {
            warn!(message_id, user_id, "Refused to delete message owned by another user");
            Err(AppError::Unauthorized)
        }
        DeleteOutcome::NotFound => Err(AppError::NotFound),
    }
}
