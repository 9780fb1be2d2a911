use serde::{Deserialize, Serialize};

// -- Session --

/// Claims carried in the session cookie. `sub` is the user id as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Auth forms --

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub text: String,
}
