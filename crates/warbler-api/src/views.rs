//! HTML rendering for every page the app serves.
//!
//! Pages are plain strings; every piece of user-supplied text goes through
//! `escape` before it is interpolated.

use std::fmt::Write;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use warbler_db::models::UserStats;
use warbler_types::models::{Message, MessageView, User};

/// Notice shown when a request lacks a usable identity or the right owner.
pub const UNAUTHORIZED_NOTICE: &str = "Access unauthorized.";

/// HTTP 302 to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

enum Notice<'a> {
    Danger(&'a str),
}

fn layout(title: &str, viewer: Option<&User>, notice: Option<Notice<'_>>, body: &str) -> String {
    let nav = match viewer {
        Some(user) => format!(
            r#"<a href="/users/{id}">@{name}</a> <a href="/messages/new">New Message</a> <a href="/logout">Log out</a>"#,
            id = user.id,
            name = escape(&user.username),
        ),
        None => r#"<a href="/signup">Sign up</a> <a href="/login">Log in</a>"#.to_string(),
    };
    let notice = match notice {
        Some(Notice::Danger(text)) => {
            format!(r#"<div class="alert alert-danger">{}</div>"#, escape(text))
        }
        None => String::new(),
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title} | Warbler</title></head>
<body>
<nav><a href="/">Warbler</a> {nav}</nav>
<div class="container">
{notice}
{body}
</div>
</body>
</html>"#,
        title = escape(title),
    )
}

fn message_list(messages: &[MessageView], liked: &[i64], show_like: bool) -> String {
    let mut out = String::from(r#"<ul class="list-group" id="messages">"#);
    for view in messages {
        let msg = &view.message;
        let like = if show_like {
            let class = if liked.contains(&msg.id) { "btn-primary" } else { "btn-secondary" };
            format!(
                r#"<form method="POST" action="/users/add_like/{id}"><button class="btn {class}">Like</button></form>"#,
                id = msg.id,
            )
        } else {
            String::new()
        };
        let _ = write!(
            out,
            r#"<li class="list-group-item"><a href="/messages/{id}"><img src="{img}" alt="" class="timeline-image"></a> <a href="/users/{uid}">@{name}</a> <span class="text-muted">{ts}</span> <p>{text}</p>{like}</li>"#,
            id = msg.id,
            img = escape(&view.author_image_url),
            uid = msg.user_id,
            name = escape(&view.author_username),
            ts = msg.timestamp.format("%d %B %Y"),
            text = escape(&msg.text),
        );
    }
    out.push_str("</ul>");
    out
}

pub fn unauthorized() -> String {
    layout(
        "Unauthorized",
        None,
        Some(Notice::Danger(UNAUTHORIZED_NOTICE)),
        r#"<p><a href="/login">Log in</a> or <a href="/signup">sign up</a> to continue.</p>"#,
    )
}

pub fn not_found() -> String {
    layout("Not found", None, None, "<h1>404</h1><p>That page does not exist.</p>")
}

pub fn server_error() -> String {
    layout("Error", None, None, "<h1>500</h1><p>Something went wrong.</p>")
}

pub fn home_anon() -> String {
    layout(
        "Home",
        None,
        None,
        r#"<h1>What's Happening?</h1><h4>New to Warbler?</h4><a href="/signup" class="btn btn-primary">Sign up now</a>"#,
    )
}

pub fn home_feed(viewer: &User, feed: &[MessageView], liked: &[i64]) -> String {
    let body = format!(
        r#"<aside><a href="/users/{id}"><img src="{img}" alt=""></a> <a href="/users/{id}">@{name}</a></aside>{list}"#,
        id = viewer.id,
        img = escape(&viewer.image_url),
        name = escape(&viewer.username),
        list = message_list(feed, liked, true),
    );
    layout("Home", Some(viewer), None, &body)
}

pub fn profile(
    viewer: Option<&User>,
    user: &User,
    stats: &UserStats,
    messages: &[MessageView],
    is_following: bool,
) -> String {
    let action = match viewer {
        Some(v) if v.id == user.id => String::from(
            r#"<form method="POST" action="/users/delete"><button class="btn btn-danger">Delete Profile</button></form>"#,
        ),
        Some(_) if is_following => format!(
            r#"<form method="POST" action="/users/stop-following/{}"><button class="btn btn-primary">Unfollow</button></form>"#,
            user.id
        ),
        Some(_) => format!(
            r#"<form method="POST" action="/users/follow/{}"><button class="btn btn-outline-primary">Follow</button></form>"#,
            user.id
        ),
        None => String::new(),
    };
    let body = format!(
        r#"<div id="warbler-hero" style="background-image: url('{header}')"></div>
<img src="{img}" alt="Image for {name}" id="profile-avatar">
<h4 id="sidebar-username">@{name}</h4>
<p>{bio}</p><p>{location}</p>
<ul class="user-stats">
<li><a href="/users/{id}">Messages {messages}</a></li>
<li><a href="/users/{id}/following">Following {following}</a></li>
<li><a href="/users/{id}/followers">Followers {followers}</a></li>
<li><a href="/users/{id}/likes">Likes {likes}</a></li>
</ul>
{action}
{list}"#,
        header = escape(&user.header_image_url),
        img = escape(&user.image_url),
        name = escape(&user.username),
        bio = escape(user.bio.as_deref().unwrap_or("")),
        location = escape(user.location.as_deref().unwrap_or("")),
        id = user.id,
        messages = stats.messages,
        following = stats.following,
        followers = stats.followers,
        likes = stats.likes,
        list = message_list(messages, &[], false),
    );
    layout(&user.username, viewer, None, &body)
}

pub fn user_list(viewer: &User, owner: &User, heading: &str, users: &[User]) -> String {
    let mut body = format!("<h2>@{} {}</h2><ul>", escape(&owner.username), escape(heading));
    if users.is_empty() {
        body.push_str("<li>No one yet.</li>");
    }
    for user in users {
        let _ = write!(
            body,
            r#"<li class="card"><img src="{img}" alt=""> <a href="/users/{id}">@{name}</a></li>"#,
            img = escape(&user.image_url),
            id = user.id,
            name = escape(&user.username),
        );
    }
    body.push_str("</ul>");
    layout(heading, Some(viewer), None, &body)
}

pub fn liked_messages(viewer: &User, owner: &User, messages: &[MessageView], liked: &[i64]) -> String {
    let body = format!(
        "<h2>Liked by @{}</h2>{}",
        escape(&owner.username),
        message_list(messages, liked, owner.id == viewer.id)
    );
    layout("Likes", Some(viewer), None, &body)
}

pub fn message_detail(viewer: &User, message: &Message, author: &User) -> String {
    let delete = if viewer.id == author.id {
        format!(
            r#"<form method="POST" action="/messages/{}/delete"><button class="btn btn-outline-danger">Delete</button></form>"#,
            message.id
        )
    } else {
        String::new()
    };
    let body = format!(
        r#"<div class="message-area">
<a href="/users/{uid}"><img src="{img}" alt=""></a>
<a href="/users/{uid}">@{name}</a>
{delete}
<p class="single-message">{text}</p>
<span class="text-muted">{ts}</span>
</div>"#,
        uid = author.id,
        img = escape(&author.image_url),
        name = escape(&author.username),
        text = escape(&message.text),
        ts = message.timestamp.format("%d %B %Y"),
    );
    layout("Message", Some(viewer), None, &body)
}

pub fn new_message_form(viewer: &User, error: Option<&str>, text: &str) -> String {
    let body = format!(
        r#"<form method="POST" id="message_form"><textarea name="text" placeholder="What's happening?">{}</textarea><button class="btn btn-success">Add my message!</button></form>"#,
        escape(text)
    );
    layout("New Message", Some(viewer), error.map(Notice::Danger), &body)
}

pub fn signup_form(viewer: Option<&User>, error: Option<&str>) -> String {
    let body = r#"<h2>Join Warbler today.</h2>
<form method="POST" id="user_form">
<input name="username" placeholder="Username">
<input name="email" placeholder="E-mail">
<input name="password" type="password" placeholder="Password">
<input name="image_url" placeholder="(Optional) Image URL">
<button class="btn btn-primary">Sign me up!</button>
</form>"#;
    layout("Sign up", viewer, error.map(Notice::Danger), body)
}

pub fn login_form(viewer: Option<&User>, error: Option<&str>) -> String {
    let body = r#"<h2>Welcome back.</h2>
<form method="POST" id="user_form">
<input name="username" placeholder="Username">
<input name="password" type="password" placeholder="Password">
<button class="btn btn-primary">Log in</button>
</form>"#;
    layout("Log in", viewer, error.map(Notice::Danger), body)
}
