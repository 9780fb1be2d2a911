//! Shared fixtures: each test gets its own in-memory database and router.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use warbler_api::auth::{AppState, AppStateInner};
use warbler_api::router;
use warbler_api::session::{SESSION_COOKIE, issue_token};
use warbler_db::Database;
use warbler_db::models::{MessageRow, NewMessage, NewUser, UserRow};

pub const SECRET: &str = "test-session-secret";

pub struct TestApp {
    pub state: AppState,
    pub app: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        let state: AppState = Arc::new(AppStateInner {
            db,
            session_secret: SECRET.to_string(),
        });
        let app = router(state.clone());
        Self { state, app }
    }

    /// Insert a user with a fixed id. The stored hash is not a real one;
    /// tests that log in go through /signup instead.
    pub fn user(&self, id: i64, username: &str) -> UserRow {
        let email = format!("{username}@test.com");
        self.state
            .db
            .create_user(
                &NewUser {
                    id: Some(id),
                    username,
                    email: &email,
                    image_url: None,
                },
                "unused-hash",
            )
            .expect("create user")
    }

    pub fn message(&self, id: i64, text: &str, user_id: i64) -> MessageRow {
        self.state
            .db
            .insert_message(&NewMessage {
                id: Some(id),
                text,
                user_id,
            })
            .expect("insert message")
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.expect("router is infallible")
    }
}

/// `Cookie` header value that authenticates as `user_id`.
pub fn session_for(user_id: i64) -> String {
    format!("{}={}", SESSION_COOKIE, issue_token(SECRET, user_id).unwrap())
}

pub fn get(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut req = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = session {
        req = req.header(header::COOKIE, cookie);
    }
    req.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, session: Option<&str>, form: &str) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = session {
        req = req.header(header::COOKIE, cookie);
    }
    req.body(Body::from(form.to_string())).unwrap()
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(resp: &Response<Body>) -> &str {
    resp.headers()[header::LOCATION].to_str().unwrap()
}

/// The `name=value` pair of the session cookie a response sets.
pub fn set_session(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}
