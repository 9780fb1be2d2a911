use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use rand_core::OsRng;
use tracing::{info, warn};

use warbler_db::Database;
use warbler_db::models::NewUser;
use warbler_db::queries::is_unique_violation;
use warbler_types::api::{LoginForm, SignupForm};
use warbler_types::models::MAX_USERNAME_LEN;

use crate::error::AppError;
use crate::session::{AuthContext, expired_session_cookie, issue_token, session_cookie};
use crate::views;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session_secret: String,
}

const MIN_PASSWORD_LEN: usize = 6;

/// Run blocking database work off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let out = tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;
    Ok(out)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("argon2 hash_password error: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("argon2 parse hash error: {}", e))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

pub async fn signup_form(auth: AuthContext) -> Html<String> {
    Html(views::signup_form(auth.viewer().as_ref(), None))
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_lowercase();
    let image_url = form
        .image_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());

    // Validate input
    let problem = if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        Some("Username must be 1 to 20 characters.")
    } else if !email.contains('@') {
        Some("Invalid email address.")
    } else if form.password.len() < MIN_PASSWORD_LEN {
        Some("Password must be at least 6 characters.")
    } else {
        None
    };
    if let Some(problem) = problem {
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(views::signup_form(None, Some(problem)))).into_response());
    }

    let password_hash = hash_password(&form.password)?;

    let created = {
        let username = username.clone();
        with_db(&state, move |db| {
            let new = NewUser {
                id: None,
                username: &username,
                email: &email,
                image_url: image_url.as_deref(),
            };
            match db.create_user(&new, &password_hash) {
                Ok(user) => Ok(Some(user)),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await?
    };

    let Some(user) = created else {
        warn!(%username, "Signup rejected: username or email taken");
        let page = views::signup_form(None, Some("Username already taken"));
        return Ok((StatusCode::CONFLICT, Html(page)).into_response());
    };

    info!(user_id = user.id, username = %user.username, "User signed up");
    let token = issue_token(&state.session_secret, user.id)?;
    Ok((jar.add(session_cookie(token)), views::found("/")).into_response())
}

pub async fn login_form(auth: AuthContext) -> Html<String> {
    Html(views::login_form(auth.viewer().as_ref(), None))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim().to_string();
    let user = with_db(&state, move |db| db.get_user_by_username(&username)).await?;

    let authenticated = match user {
        Some(user) => verify_password(&form.password, &user.password)?.then_some(user),
        None => None,
    };

    let Some(user) = authenticated else {
        warn!(username = %form.username, "Login failed");
        return Ok((StatusCode::UNAUTHORIZED, Html(views::login_form(None, Some("Invalid credentials.")))).into_response());
    };

    info!(user_id = user.id, "User logged in");
    let token = issue_token(&state.session_secret, user.id)?;
    Ok((jar.add(session_cookie(token)), views::found("/")).into_response())
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(expired_session_cookie()), views::found("/login"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("testuser").expect("hashing should succeed");
        assert_ne!(hash, "testuser");
        assert!(verify_password("testuser", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse").expect("hashing should succeed");
        assert!(!verify_password("wrong-horse", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify_password("anything", "not-a-valid-hash").is_err());
    }
}
