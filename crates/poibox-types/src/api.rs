use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Session claims --

/// Signed token stored in the session cookies. `sid` names the server-side
/// session row; the token is only honoured while that row exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sid: Uuid,
    /// Account handle or listener name.
    pub sub: String,
    /// Liver handle for listener sessions, `None` for account sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub exp: usize,
}

// -- Accounts --

// Every form field defaults to empty so a missing field reaches validation
// instead of failing extraction.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub handle: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub handle: String,
    pub password: String,
}

// -- Landing / admin search --

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// -- Admin panel --

/// What a post to `/admin` asks for. Parsed from [`AdminForm::action`] by
/// `validate::admin_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Create,
    Adjust,
}

/// Single form posted to `/admin`. The action and numeric fields arrive as
/// text so a bad value surfaces as a validation message.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminForm {
    pub action: String,
    pub name: String,
    pub points: String,
    pub reason: String,
}

// -- Listener side --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WelcomeForm {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub message: String,
    /// Empty for a top-level post.
    pub parent_id: String,
}
