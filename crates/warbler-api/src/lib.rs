pub mod auth;
pub mod error;
pub mod follows;
pub mod likes;
pub mod messages;
pub mod params;
pub mod session;
pub mod users;
pub mod views;

use axum::{
    Router,
    routing::{get, post},
};

use crate::auth::AppState;

/// Every Warbler route, bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(users::homepage))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/users/{user_id}", get(users::show_user))
        .route("/users/{user_id}/following", get(follows::show_following))
        .route("/users/{user_id}/followers", get(follows::show_followers))
        .route("/users/{user_id}/likes", get(likes::show_likes))
        .route("/users/follow/{user_id}", post(follows::follow))
        .route("/users/stop-following/{user_id}", post(follows::stop_following))
        .route("/users/add_like/{message_id}", post(likes::toggle_like))
        .route("/users/delete", post(users::delete_user))
        .route(
            "/messages/new",
            get(messages::new_message_form).post(messages::create_message),
        )
        .route("/messages/{message_id}", get(messages::show_message))
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}
