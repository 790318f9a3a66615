//! In-process harness: drives the router with `oneshot` and keeps a small
//! cookie store per simulated browser.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use poibox_api::{AppState, AppStateInner, Settings};
use poibox_db::Database;

pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub state: AppState,
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        let state = Arc::new(AppStateInner {
            db,
            session_secret: "test-secret-key".to_string(),
            settings,
        });
        let router = poibox_api::router(state.clone());
        Self {
            state,
            router,
            _dir: dir,
        }
    }

    /// A fresh browser with an empty cookie store.
    pub fn client(&self) -> Client {
        Client {
            router: self.router.clone(),
            cookies: BTreeMap::new(),
        }
    }

    /// Signs up a liver and returns their logged-in browser.
    pub async fn liver(&self, handle: &str) -> Client {
        let mut client = self.client();
        let res = client
            .post("/signup", &[("handle", handle), ("password", PASSWORD)])
            .await;
        assert_eq!(res.location.as_deref(), Some("/admin"), "signup failed");
        client
    }

    /// Identifies as `name` on `liver`'s pages and returns that browser.
    pub async fn listener(&self, liver: &str, name: &str) -> Client {
        let mut client = self.client();
        let res = client.post(&format!("/{liver}/welcome"), &[("name", name)]).await;
        assert_eq!(res.location, Some(format!("/{liver}/welcome")));
        client
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

pub struct Client {
    router: Router,
    pub cookies: BTreeMap<String, String>,
}

impl Client {
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&mut self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        let encoded = form
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.send(Method::POST, path, Some(encoded)).await
    }

    /// Posts a form and loads the page it redirects to.
    pub async fn submit(&mut self, path: &str, form: &[(&str, &str)]) -> TestResponse {
        let res = self.post(path, form).await;
        self.follow(res).await
    }

    pub async fn follow(&mut self, res: TestResponse) -> TestResponse {
        let location = res.location.expect("response is not a redirect");
        let path = location.split('#').next().unwrap_or("/").to_string();
        self.get(&path).await
    }

    async fn send(&mut self, method: Method, path: &str, form: Option<String>) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            req = req.header(header::COOKIE, cookie);
        }
        let body = match form {
            Some(form) => {
                req = req.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form)
            }
            None => Body::empty(),
        };

        let res = self.router.clone().oneshot(req.body(body).unwrap()).await.unwrap();

        for set_cookie in res.headers().get_all(header::SET_COOKIE) {
            let raw = set_cookie.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            if value.is_empty() || raw.contains("Max-Age=0") {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }

        let status = res.status();
        let location = res
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = res.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
