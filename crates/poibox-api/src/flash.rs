//! One-shot messages carried across a redirect in a cookie.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const FLASH_COOKIE: &str = "poibox_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Notice,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    fn encode(&self) -> String {
        let prefix = match self.kind {
            FlashKind::Notice => "n",
            FlashKind::Error => "e",
        };
        format!("{}.{}", prefix, urlencoding::encode(&self.message))
    }

    fn decode(raw: &str) -> Option<Self> {
        let (prefix, message) = raw.split_once('.')?;
        let kind = match prefix {
            "n" => FlashKind::Notice,
            "e" => FlashKind::Error,
            _ => return None,
        };
        let message = urlencoding::decode(message).ok()?.into_owned();
        Some(Self { kind, message })
    }
}

/// Reads the pending flash, if any, and clears it.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = Flash::decode(cookie.value());
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}

/// A `303 See Other` with an optional flash message and any cookies the
/// handler wants set on the way out.
#[derive(Debug)]
pub struct Redirected {
    location: String,
    flash: Option<Flash>,
    jar: CookieJar,
}

impl Redirected {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            flash: None,
            jar: CookieJar::new(),
        }
    }

    pub fn notice(mut self, message: impl Into<String>) -> Self {
        self.flash = Some(Flash {
            kind: FlashKind::Notice,
            message: message.into(),
        });
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.flash = Some(Flash {
            kind: FlashKind::Error,
            message: message.into(),
        });
        self
    }

    pub fn with_jar(mut self, jar: CookieJar) -> Self {
        self.jar = jar;
        self
    }
}

impl IntoResponse for Redirected {
    fn into_response(self) -> Response {
        let mut jar = self.jar;
        if let Some(flash) = &self.flash {
            jar = jar.add(
                Cookie::build((FLASH_COOKIE, flash.encode()))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax),
            );
        }
        (jar, Redirect::to(&self.location)).into_response()
    }
}
