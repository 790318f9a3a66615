mod common;

use axum::http::StatusCode;
use common::{PASSWORD, TestApp};

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let res = app.client().get("/health").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("\"ok\""));
}

#[tokio::test]
async fn admin_requires_a_session() {
    let app = TestApp::new();
    let mut anon = app.client();

    let res = anon.get("/admin").await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/login"));

    let page = anon.follow(res).await;
    assert!(page.body.contains("please sign in first"));
}

#[tokio::test]
async fn signup_lands_on_the_admin_panel() {
    let app = TestApp::new();
    let mut alice = app.liver("alice_liver").await;

    let page = alice.get("/admin").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Welcome, alice_liver!"));
    assert!(page.body.contains("alice_liver's ledger"));

    // flash is shown once
    let again = alice.get("/admin").await;
    assert!(!again.body.contains("Welcome, alice_liver!"));
}

#[tokio::test]
async fn duplicate_and_invalid_signups_are_rejected() {
    let app = TestApp::new();
    app.liver("alice_liver").await;

    let mut other = app.client();
    let res = other
        .post("/signup", &[("handle", "alice_liver"), ("password", PASSWORD)])
        .await;
    assert_eq!(res.location.as_deref(), Some("/signup"));
    assert!(other.follow(res).await.body.contains("that handle already exists"));

    let page = other
        .submit("/signup", &[("handle", "bob"), ("password", "short")])
        .await;
    assert!(page.body.contains("password must be at least 8 characters"));

    let page = other
        .submit("/signup", &[("handle", "admin"), ("password", PASSWORD)])
        .await;
    assert!(page.body.contains("is reserved"));
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = TestApp::new();
    let mut alice = app.liver("alice_liver").await;
    alice.get("/logout").await;

    let mut browser = app.client();
    let res = browser
        .post("/login", &[("handle", "alice_liver"), ("password", "wrong password")])
        .await;
    assert_eq!(res.location.as_deref(), Some("/login"));
    assert!(browser.follow(res).await.body.contains("wrong handle or password"));

    let res = browser
        .post("/login", &[("handle", "nobody_here"), ("password", PASSWORD)])
        .await;
    assert_eq!(res.location.as_deref(), Some("/login"));

    let res = browser
        .post("/login", &[("handle", "alice_liver"), ("password", PASSWORD)])
        .await;
    assert_eq!(res.location.as_deref(), Some("/admin"));
    assert_eq!(browser.get("/admin").await.status, StatusCode::OK);
}

#[tokio::test]
async fn logout_kills_the_server_side_session() {
    let app = TestApp::new();
    let mut alice = app.liver("alice_liver").await;
    let stolen = alice.cookies.get("poibox_session").cloned().unwrap();

    let res = alice.get("/logout").await;
    assert_eq!(res.location.as_deref(), Some("/"));
    assert!(!alice.cookies.contains_key("poibox_session"));

    // replaying the old token no longer works
    let mut replay = app.client();
    replay.cookies.insert("poibox_session".into(), stolen);
    let res = replay.get("/admin").await;
    assert_eq!(res.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn forged_tokens_are_ignored() {
    let app = TestApp::new();
    let mut browser = app.client();
    browser
        .cookies
        .insert("poibox_session".into(), "not.a.token".into());

    let res = browser.get("/admin").await;
    assert_eq!(res.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn landing_page_searches_livers() {
    let app = TestApp::new();
    app.liver("alice_liver").await;
    app.liver("bob_streams").await;

    let page = app.client().get("/?q=ALICE").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("/alice_liver/welcome"));
    assert!(!page.body.contains("bob_streams"));
}

#[tokio::test]
async fn incomplete_signup_forms_come_back_as_messages() {
    let app = TestApp::new();
    let mut browser = app.client();

    let res = browser.post("/signup", &[]).await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/signup"));
    assert!(browser.follow(res).await.body.contains("handle must be 3-32 characters"));

    let res = browser.post("/login", &[("handle", "alice_liver")]).await;
    assert_eq!(res.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn oversized_session_lifetime_fails_cleanly() {
    let app = TestApp::with_settings(poibox_api::Settings {
        session_days: i64::MAX,
        ..Default::default()
    });
    let mut browser = app.client();

    let res = browser
        .post("/signup", &[("handle", "alice_liver"), ("password", PASSWORD)])
        .await;
    assert_eq!(res.location.as_deref(), Some("/signup"));
    assert!(!browser.cookies.contains_key("poibox_session"));
    assert!(browser.follow(res).await.body.contains("something went wrong"));
}
