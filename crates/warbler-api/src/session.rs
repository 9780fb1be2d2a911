use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::warn;

use warbler_db::models::UserRow;
use warbler_types::api::Claims;
use warbler_types::models::User;

use crate::auth::{AppState, with_db};
use crate::error::AppError;

/// Name of the cookie holding the signed session token.
pub const SESSION_COOKIE: &str = "warbler_session";

const SESSION_DAYS: i64 = 30;

/// Sign a session token for `user_id`.
pub fn issue_token(secret: &str, user_id: i64) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify a session token and return the user id it names.
pub fn decode_token(secret: &str, token: &str) -> anyhow::Result<i64> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims.sub.parse()?)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie value matching `session_cookie`'s path, for removal.
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Who is making the request.
///
/// A session that is missing, fails verification, or names a user that no
/// longer exists all resolve to `Anonymous`.
#[derive(Debug, Clone)]
pub enum AuthContext {
    Anonymous,
    User(UserRow),
}

impl AuthContext {
    pub fn user(&self) -> Option<&UserRow> {
        match self {
            AuthContext::User(user) => Some(user),
            AuthContext::Anonymous => None,
        }
    }

    /// The current user as shown in page chrome.
    pub fn viewer(&self) -> Option<User> {
        self.user().map(UserRow::to_public)
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(AuthContext::Anonymous);
        };

        let user_id = match decode_token(&state.session_secret, cookie.value()) {
            Ok(id) => id,
            Err(e) => {
                warn!("Rejected session token: {}", e);
                return Ok(AuthContext::Anonymous);
            }
        };

        match with_db(state, move |db| db.get_user_by_id(user_id)).await? {
            Some(user) => Ok(AuthContext::User(user)),
            None => {
                warn!(user_id, "Session names a user that does not exist");
                Ok(AuthContext::Anonymous)
            }
        }
    }
}

/// An authenticated, existing user. Rejects with `AppError::Unauthorized`
/// before the handler body runs, so no write can happen for anonymous callers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRow);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match AuthContext::from_request_parts(parts, state).await? {
            AuthContext::User(user) => Ok(CurrentUser(user)),
            AuthContext::Anonymous => Err(AppError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_names_user() {
        let token = issue_token("secret", 8989).unwrap();
        assert_eq!(decode_token("secret", &token).unwrap(), 8989);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("secret", 8989).unwrap();
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "8989".into(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(decode_token("secret", &token).is_err());
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let claims = Claims {
            sub: "not-a-number".into(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(decode_token("secret", &token).is_err());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("abc".into());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
