//! E2E tests for likes and follows

mod common;

use common::{TestServer, location};
use serde_json::{Value, json};

#[tokio::test]
async fn test_like_is_idempotent() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let post = server.create_post(&alice, "like me", None).await;
    let path = format!("/like/?post_id={}&num_likes=0", post.id);

    let response = server.get_as(Some(&bob), &path).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"num_likes": 1, "is_liked": "True"}));

    let response = server.get_as(Some(&bob), &path).await;
    assert_eq!(response.status(), 200);
    assert_eq!(server.count("likes").await, 1);
    assert_eq!(server.state.db.count_likes(post.id).await.unwrap(), 1);

    // The like shows up for bob only
    let body = server.get_as(Some(&bob), "/liked/").await.text().await.unwrap();
    assert!(body.contains("like me"));
    let body = server.get_as(Some(&alice), "/liked/").await.text().await.unwrap();
    assert!(!body.contains("like me"));
}

#[tokio::test]
async fn test_unlike() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let post = server.create_post(&alice, "like me", None).await;

    // Removing a like that was never given changes nothing
    let response = server
        .get_as(Some(&bob), &format!("/removelike/?post_id={}&num_likes=3", post.id))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"num_likes": 2, "is_liked": "False"}));
    assert_eq!(server.count("likes").await, 0);

    server
        .get_as(Some(&bob), &format!("/like/?post_id={}&num_likes=0", post.id))
        .await;
    assert_eq!(server.count("likes").await, 1);

    let response = server
        .get_as(Some(&bob), &format!("/removelike/?post_id={}&num_likes=1", post.id))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"num_likes": "", "is_liked": "False"}));
    assert_eq!(server.count("likes").await, 0);
}

#[tokio::test]
async fn test_like_missing_post() {
    let server = TestServer::new().await;
    let bob = server.create_user("bob").await;

    let response = server.get_as(Some(&bob), "/like/?post_id=999&num_likes=0").await;
    assert_eq!(response.status(), 404);

    let response = server.get_as(Some(&bob), "/like/?num_likes=0").await;
    assert_eq!(response.status(), 404);
    assert_eq!(server.count("likes").await, 0);
}

#[tokio::test]
async fn test_guest_like_redirects_to_login() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let post = server.create_post(&alice, "like me", None).await;

    let response = server
        .get_as(None, &format!("/like/?post_id={}&num_likes=0", post.id))
        .await;
    assert!(location(&response).starts_with("/auth/login/?next="));
    assert_eq!(server.count("likes").await, 0);
}

#[tokio::test]
async fn test_follow_and_unfollow() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;

    for _ in 0..2 {
        let response = server.get_as(Some(&bob), "/alice/follow/").await;
        assert_eq!(location(&response), "/alice/");
    }
    assert_eq!(server.count("follows").await, 1);

    let summary = server
        .state
        .db
        .get_follow_summary(postwall::data::Viewer::User(bob.id), alice.id)
        .await
        .unwrap();
    assert!(summary.follows);
    assert_eq!(summary.follower_count, 1);

    for _ in 0..2 {
        let response = server.get_as(Some(&bob), "/alice/unfollow/").await;
        assert_eq!(location(&response), "/alice/");
    }
    assert_eq!(server.count("follows").await, 0);
}

#[tokio::test]
async fn test_self_follow_is_ignored() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let response = server.get_as(Some(&alice), "/alice/follow/").await;
    assert_eq!(location(&response), "/alice/");
    assert_eq!(server.count("follows").await, 0);
}

#[tokio::test]
async fn test_follow_unknown_user_is_404() {
    let server = TestServer::new().await;
    let bob = server.create_user("bob").await;

    let response = server.get_as(Some(&bob), "/nobody/follow/").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_follow_feed_shows_only_followed_authors() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let carol = server.create_user("carol").await;
    server.create_post(&alice, "from alice", None).await;
    server.create_post(&carol, "from carol", None).await;

    server.get_as(Some(&bob), "/alice/follow/").await;

    let body = server.get_as(Some(&bob), "/follow/").await.text().await.unwrap();
    assert!(body.contains("from alice"));
    assert!(!body.contains("from carol"));

    // Carol follows nobody
    let body = server.get_as(Some(&carol), "/follow/").await.text().await.unwrap();
    assert!(!body.contains("from alice"));
}

#[tokio::test]
async fn test_group_follow() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let cats = server.create_group("Cats", "cats").await;
    let dogs = server.create_group("Dogs", "dogs").await;
    server.create_post(&alice, "meow", Some(&cats)).await;
    server.create_post(&alice, "woof", Some(&dogs)).await;

    let response = server.get_as(Some(&bob), "/group/cats/follow/").await;
    assert_eq!(location(&response), "/group/cats/");
    let response = server.get_as(Some(&bob), "/group/cats/follow/?overview=1").await;
    assert_eq!(location(&response), "/groups/");
    assert_eq!(server.count("group_follows").await, 1);

    let body = server
        .get_as(Some(&bob), "/groups/follow/")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("meow"));
    assert!(!body.contains("woof"));

    let response = server.get_as(Some(&bob), "/group/cats/unfollow/?overview=1").await;
    assert_eq!(location(&response), "/groups/");
    assert_eq!(server.count("group_follows").await, 0);

    let response = server.get_as(Some(&bob), "/group/nope/follow/").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_like_with_huge_displayed_count() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let post = server.create_post(&alice, "like me", None).await;

    let response = server
        .get_as(
            Some(&bob),
            &format!("/like/?post_id={}&num_likes={}", post.id, i64::MAX),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"num_likes": i64::MAX, "is_liked": "True"}));
    assert_eq!(server.count("likes").await, 1);
}
