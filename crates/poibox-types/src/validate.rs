//! Form field validation shared by the HTTP handlers.

use thiserror::Error;

use crate::api::AdminAction;

pub const HANDLE_MIN: usize = 3;
pub const HANDLE_MAX: usize = 32;
pub const PASSWORD_MIN: usize = 8;
pub const LISTENER_NAME_MAX: usize = 32;
pub const POST_BODY_MAX: usize = 1000;
pub const REASON_MAX: usize = 200;
/// Upper bound for a single adjustment or opening balance.
pub const POINTS_MAX: i64 = 1_000_000_000;

/// Handles that would shadow a fixed route segment.
const RESERVED_HANDLES: &[&str] = &["admin", "like", "login", "logout", "signup", "health"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

fn invalid<T>(msg: impl Into<String>) -> Result<T, ValidationError> {
    Err(ValidationError(msg.into()))
}

/// Account handles double as URL path segments.
pub fn handle(raw: &str) -> Result<&str, ValidationError> {
    let h = raw.trim();
    if h.len() < HANDLE_MIN || h.len() > HANDLE_MAX {
        return invalid(format!(
            "handle must be {HANDLE_MIN}-{HANDLE_MAX} characters"
        ));
    }
    if !h.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return invalid("handle may only contain letters, digits and underscores");
    }
    if RESERVED_HANDLES.contains(&h.to_ascii_lowercase().as_str()) {
        return invalid(format!("\"{h}\" is reserved"));
    }
    Ok(h)
}

pub fn password(raw: &str) -> Result<&str, ValidationError> {
    if raw.chars().count() < PASSWORD_MIN {
        return invalid(format!("password must be at least {PASSWORD_MIN} characters"));
    }
    Ok(raw)
}

pub fn listener_name(raw: &str) -> Result<&str, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return invalid("name is required");
    }
    if name.chars().count() > LISTENER_NAME_MAX {
        return invalid(format!("name must be at most {LISTENER_NAME_MAX} characters"));
    }
    if name.chars().any(char::is_control) {
        return invalid("name contains invalid characters");
    }
    Ok(name)
}

pub fn post_body(raw: &str) -> Result<&str, ValidationError> {
    let body = raw.trim();
    if body.is_empty() {
        return invalid("message is empty");
    }
    if body.chars().count() > POST_BODY_MAX {
        return invalid(format!("message must be at most {POST_BODY_MAX} characters"));
    }
    Ok(body)
}

pub fn reason(raw: &str) -> Result<&str, ValidationError> {
    let reason = raw.trim();
    if reason.chars().count() > REASON_MAX {
        return invalid(format!("reason must be at most {REASON_MAX} characters"));
    }
    Ok(reason)
}

/// Opening balance for a new listener. Empty means zero.
pub fn initial_points(raw: &str) -> Result<i64, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    let points: i64 = raw
        .parse()
        .or_else(|_| invalid("points must be a whole number"))?;
    if !(0..=POINTS_MAX).contains(&points) {
        return invalid(format!("points must be between 0 and {POINTS_MAX}"));
    }
    Ok(points)
}

/// Signed adjustment amount; a leading `+` is accepted.
pub fn delta(raw: &str) -> Result<i64, ValidationError> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let delta: i64 = raw
        .parse()
        .or_else(|_| invalid("amount must be a whole number"))?;
    if delta == 0 {
        return invalid("amount must not be zero");
    }
    if !(-POINTS_MAX..=POINTS_MAX).contains(&delta) {
        return invalid(format!("amount must be within ±{POINTS_MAX}"));
    }
    Ok(delta)
}

pub fn admin_action(raw: &str) -> Result<AdminAction, ValidationError> {
    match raw.trim() {
        "create" => Ok(AdminAction::Create),
        "adjust" => Ok(AdminAction::Adjust),
        _ => invalid("unknown action"),
    }
}

/// Post id taken from a URL segment.
pub fn post_id(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse()
        .or_else(|_| invalid("invalid post id"))
}

/// Optional reply target from a form field.
pub fn parent_id(raw: &str) -> Result<Option<i64>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .or_else(|_| invalid("invalid reply target"))
}
