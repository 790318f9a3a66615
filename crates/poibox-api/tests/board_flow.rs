mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn posts_and_replies() {
    let app = TestApp::new();
    app.liver("alice_liver").await;
    let mut bob = app.listener("alice_liver", "bob").await;

    let res = bob.post("/alice_liver/board", &[("message", "hi")]).await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/alice_liver/board#post-1"));

    let res = bob
        .post("/alice_liver/board", &[("message", "re"), ("parent_id", "1")])
        .await;
    assert_eq!(res.location.as_deref(), Some("/alice_liver/board#post-2"));

    let page = bob
        .submit("/alice_liver/board", &[("message", "re2"), ("parent_id", "999")])
        .await;
    assert!(page.body.contains("post not found"));
    assert!(page.body.contains("id=\"post-1\""));
    assert!(page.body.contains("id=\"post-2\""));
    assert!(!page.body.contains("re2"));

    let page = bob
        .submit("/alice_liver/board", &[("message", "   ")])
        .await;
    assert!(page.body.contains("message is empty"));
}

#[tokio::test]
async fn board_escapes_messages() {
    let app = TestApp::new();
    app.liver("alice_liver").await;
    let mut bob = app.listener("alice_liver", "bob").await;

    let page = bob
        .submit("/alice_liver/board", &[("message", "<script>alert(1)</script>")])
        .await;
    assert!(!page.body.contains("<script>"));
    assert!(page.body.contains("&lt;script&gt;"));
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_welcome() {
    let app = TestApp::new();
    app.liver("alice_liver").await;
    let mut stranger = app.client();

    let page = stranger.get("/alice_liver/board").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Enter your name"));

    let res = stranger.post("/alice_liver/board", &[("message", "hi")]).await;
    assert_eq!(res.location.as_deref(), Some("/alice_liver/welcome"));
    assert!(stranger.follow(res).await.body.contains("please sign in first"));

    let res = stranger.post("/like/1", &[]).await;
    assert_eq!(res.location.as_deref(), Some("/"));
}

#[tokio::test]
async fn listener_sessions_are_scoped_to_one_liver() {
    let app = TestApp::new();
    app.liver("alice_liver").await;
    app.liver("dave_liver").await;
    let mut bob = app.listener("alice_liver", "bob").await;

    let res = bob.post("/dave_liver/board", &[("message", "hi")]).await;
    assert_eq!(res.location.as_deref(), Some("/dave_liver/welcome"));

    let page = bob.get("/dave_liver/welcome").await;
    assert!(page.body.contains("your name"));
    assert!(app.state.db.list_posts("dave_liver").unwrap().top_level.is_empty());
}

#[tokio::test]
async fn likes_reward_the_author_once() {
    let app = TestApp::new();
    app.liver("alice_liver").await;
    let mut bob = app.listener("alice_liver", "bob").await;
    let mut carol = app.listener("alice_liver", "carol").await;

    bob.post("/alice_liver/board", &[("message", "hi")]).await;

    let page = bob.get("/alice_liver/board").await;
    assert!(!page.body.contains("action=\"/like/1\""));
    let page = carol.get("/alice_liver/board").await;
    assert!(page.body.contains("action=\"/like/1\""));

    let res = carol.post("/like/1", &[]).await;
    assert_eq!(res.location.as_deref(), Some("/alice_liver/board#post-1"));
    let page = carol.follow(res).await;
    assert!(page.body.contains("♥ 1"));

    let page = carol.submit("/like/1", &[]).await;
    assert!(page.body.contains("you already liked this post"));

    let page = bob.submit("/like/1", &[]).await;
    assert!(page.body.contains("you cannot like your own post"));

    let page = carol.submit("/like/99", &[]).await;
    assert!(page.body.contains("post not found"));

    let post = app.state.db.get_post(1).unwrap().unwrap();
    assert_eq!(post.like_count, 1);
    let bob_row = app
        .state
        .db
        .get_listener("alice_liver", "bob")
        .unwrap()
        .unwrap();
    assert_eq!((bob_row.points, bob_row.total_points), (1, 1));

    let page = bob.get("/alice_liver/welcome").await;
    assert!(page.body.contains("You have <b>1</b> points"));
}

#[tokio::test]
async fn like_reward_can_be_turned_off() {
    let app = TestApp::with_settings(poibox_api::Settings {
        like_reward: 0,
        ..Default::default()
    });
    app.liver("alice_liver").await;
    let mut bob = app.listener("alice_liver", "bob").await;
    let mut carol = app.listener("alice_liver", "carol").await;

    bob.post("/alice_liver/board", &[("message", "hi")]).await;
    carol.post("/like/1", &[]).await;

    assert_eq!(app.state.db.get_post(1).unwrap().unwrap().like_count, 1);
    let bob_row = app
        .state
        .db
        .get_listener("alice_liver", "bob")
        .unwrap()
        .unwrap();
    assert_eq!(bob_row.points, 0);
}

#[tokio::test]
async fn likes_stay_on_the_listeners_own_board() {
    let app = TestApp::new();
    app.liver("alice_liver").await;
    app.liver("dave_liver").await;
    let mut erin = app.listener("dave_liver", "erin").await;
    let mut bob = app.listener("alice_liver", "bob").await;

    erin.post("/dave_liver/board", &[("message", "hi")]).await;

    let res = bob.post("/like/1", &[]).await;
    assert_eq!(res.location.as_deref(), Some("/dave_liver/board"));
    assert!(bob.follow(res).await.body.contains("you are not allowed to do that"));
    assert_eq!(app.state.db.get_post(1).unwrap().unwrap().like_count, 0);
}

#[tokio::test]
async fn encoded_slashes_in_the_liver_segment_go_home() {
    let app = TestApp::new();
    let mut stranger = app.client();

    let res = stranger
        .post("/%2Fevil.example/board", &[("message", "hi")])
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/"));
    assert!(stranger.follow(res).await.body.contains("liver not found"));

    let res = stranger
        .post("/%2Fevil.example/welcome", &[("name", "bob")])
        .await;
    assert_eq!(res.location.as_deref(), Some("/"));
}

#[tokio::test]
async fn malformed_board_requests_come_back_as_messages() {
    let app = TestApp::new();
    app.liver("alice_liver").await;
    let mut bob = app.listener("alice_liver", "bob").await;

    let res = bob.post("/like/abc", &[]).await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location.as_deref(), Some("/alice_liver/board"));
    assert!(bob.follow(res).await.body.contains("invalid post id"));

    let res = bob.post("/alice_liver/board", &[]).await;
    assert_eq!(res.location.as_deref(), Some("/alice_liver/board"));
    assert!(bob.follow(res).await.body.contains("message is empty"));

    let res = app.client().post("/alice_liver/welcome", &[]).await;
    assert_eq!(res.location.as_deref(), Some("/alice_liver/welcome"));
}
