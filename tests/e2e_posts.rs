//! E2E tests for posting, editing and commenting through the HTML pages

mod common;

use common::{TestServer, location, png_bytes};
use postwall::forms::INVALID_IMAGE_MESSAGE;
use reqwest::multipart::{Form, Part};

fn post_form(text: &str, group: Option<i64>) -> Form {
    let form = Form::new().text("text", text.to_string());
    match group {
        Some(id) => form.text("group", id.to_string()),
        None => form.text("group", ""),
    }
}

#[tokio::test]
async fn test_post_is_consistent_across_pages() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let group = server.create_group("g1", "g1").await;

    let response = server
        .post_multipart_as(Some(&alice), "/new/", post_form("hello", Some(group.id)))
        .await;
    assert_eq!(location(&response), "/");
    assert_eq!(server.count("posts").await, 1);

    let post_id = server
        .state
        .db
        .list_post_views(postwall::data::Viewer::Anonymous, postwall::data::PostScope::All)
        .await
        .unwrap()[0]
        .id;

    for path in [
        "/".to_string(),
        "/group/g1/".to_string(),
        "/alice/".to_string(),
        format!("/alice/{}/", post_id),
    ] {
        let response = server.get_as(None, &path).await;
        assert_eq!(response.status(), 200, "GET {}", path);
        let body = response.text().await.unwrap();
        assert!(body.contains(r#"<a class="post-author" href="/alice/">alice</a>"#), "{}", path);
        assert!(body.contains(r#"<p class="post-text">hello</p>"#), "{}", path);
        assert!(body.contains(r#"href="/group/g1/">g1</a>"#), "{}", path);
    }
}

#[tokio::test]
async fn test_guest_cannot_create_post() {
    let server = TestServer::new().await;

    let response = server.get_as(None, "/new/").await;
    assert_eq!(location(&response), "/auth/login/?next=%2Fnew%2F");

    let response = server
        .post_multipart_as(None, "/new/", post_form("sneaky", None))
        .await;
    assert!(location(&response).starts_with("/auth/login/"));
    assert_eq!(server.count("posts").await, 0);
}

#[tokio::test]
async fn test_non_image_upload_is_rejected() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let form = post_form("post with a bad file", None).part(
        "image",
        Part::bytes(b"just some text".to_vec())
            .file_name("small.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let response = server.post_multipart_as(Some(&alice), "/new/", form).await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains(INVALID_IMAGE_MESSAGE));
    assert_eq!(server.count("posts").await, 0);
}

#[tokio::test]
async fn test_image_upload_with_crop() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let form = post_form("cropped", None)
        .part(
            "image",
            Part::bytes(png_bytes(64, 48))
                .file_name("photo.png")
                .mime_str("image/png")
                .unwrap(),
        )
        .text("crop_data", r#"{"x": 8, "y": 4, "width": 32, "height": 16}"#);
    let response = server.post_multipart_as(Some(&alice), "/new/", form).await;
    assert_eq!(location(&response), "/");

    let posts = server
        .state
        .db
        .list_post_views(postwall::data::Viewer::Anonymous, postwall::data::PostScope::All)
        .await
        .unwrap();
    let key = posts[0].image.clone().expect("image stored");
    assert!(key.starts_with("posts/"));

    // Served from the local media directory, already cropped
    let response = server.get_as(None, &format!("/media/{}", key)).await;
    assert_eq!(response.status(), 200);
    let bytes = response.bytes().await.unwrap();
    let stored = image::load_from_memory(&bytes).unwrap();
    assert_eq!((stored.width(), stored.height()), (32, 16));
}

#[tokio::test]
async fn test_crop_outside_image_is_rejected() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let form = post_form("too far", None)
        .part(
            "image",
            Part::bytes(png_bytes(10, 10))
                .file_name("photo.png")
                .mime_str("image/png")
                .unwrap(),
        )
        .text("crop_data", r#"{"x": 5, "y": 5, "width": 20, "height": 20}"#);
    let response = server.post_multipart_as(Some(&alice), "/new/", form).await;

    assert_eq!(response.status(), 200);
    assert_eq!(server.count("posts").await, 0);
}

#[tokio::test]
async fn test_non_author_cannot_edit() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let group = server.create_group("g1", "g1").await;
    let post = server.create_post(&alice, "original", Some(&group)).await;
    let edit_path = format!("/alice/{}/edit/", post.id);

    let response = server.get_as(Some(&bob), &edit_path).await;
    assert_eq!(location(&response), format!("/alice/{}/", post.id));

    let response = server
        .post_multipart_as(Some(&bob), &edit_path, post_form("hijacked", None))
        .await;
    assert_eq!(location(&response), format!("/alice/{}/", post.id));

    let stored = server.state.db.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "original");
    assert_eq!(stored.group_id, Some(group.id));
}

#[tokio::test]
async fn test_author_edits_post() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let group = server.create_group("g1", "g1").await;
    let post = server.create_post(&alice, "original", None).await;
    let edit_path = format!("/alice/{}/edit/", post.id);

    let response = server.get_as(Some(&alice), &edit_path).await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("original"));

    let response = server
        .post_multipart_as(Some(&alice), &edit_path, post_form("edited", Some(group.id)))
        .await;
    assert_eq!(location(&response), format!("/alice/{}/", post.id));

    let stored = server.state.db.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "edited");
    assert_eq!(stored.group_id, Some(group.id));
}

#[tokio::test]
async fn test_edit_under_wrong_username_is_404() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let post = server.create_post(&alice, "original", None).await;

    let response = server
        .get_as(Some(&bob), &format!("/bob/{}/edit/", post.id))
        .await;
    assert_eq!(response.status(), 404);

    let response = server.get_as(None, &format!("/bob/{}/", post.id)).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_comments() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;
    let post = server.create_post(&alice, "discuss", None).await;
    let comment_path = format!("/alice/{}/comment", post.id);

    // Guests are sent to log in
    let response = server
        .post_form_as(None, &comment_path, &[("text", "anonymous")])
        .await;
    assert!(location(&response).starts_with("/auth/login/"));
    assert_eq!(server.count("comments").await, 0);

    // Blank comments are dropped
    let response = server
        .post_form_as(Some(&bob), &comment_path, &[("text", "   ")])
        .await;
    assert_eq!(location(&response), format!("/alice/{}/", post.id));
    assert_eq!(server.count("comments").await, 0);

    let response = server
        .post_form_as(Some(&bob), &comment_path, &[("text", "nice post")])
        .await;
    assert_eq!(location(&response), format!("/alice/{}/", post.id));
    assert_eq!(server.count("comments").await, 1);

    let body = server
        .get_as(None, &format!("/alice/{}/", post.id))
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("nice post"));
    assert!(body.contains("Comments (1)"));

    let comment_id = server.state.db.list_comments(post.id).await.unwrap()[0].id;
    let remove_path = format!("/alice/{}/remove-comment/{}", post.id, comment_id);

    // Only the comment's author can remove it
    let response = server.get_as(Some(&alice), &remove_path).await;
    assert_eq!(location(&response), format!("/alice/{}/", post.id));
    assert_eq!(server.count("comments").await, 1);

    let response = server.get_as(Some(&bob), &remove_path).await;
    assert_eq!(location(&response), format!("/alice/{}/", post.id));
    assert_eq!(server.count("comments").await, 0);

    // Already gone
    let response = server.get_as(Some(&bob), &remove_path).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_pagination_clamps() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    for i in 0..13 {
        server.create_post(&alice, &format!("post number {}", i), None).await;
    }

    let body = server.get_as(None, "/").await.text().await.unwrap();
    assert!(body.contains("Page 1 of 2"));
    assert_eq!(body.matches(r#"<article class="post""#).count(), 10);

    let body = server.get_as(None, "/?page=999").await.text().await.unwrap();
    assert!(body.contains("Page 2 of 2"));
    assert_eq!(body.matches(r#"<article class="post""#).count(), 3);

    let body = server.get_as(None, "/?page=abc").await.text().await.unwrap();
    assert!(body.contains("Page 1 of 2"));
}

#[tokio::test]
async fn test_unknown_group_and_user_are_404() {
    let server = TestServer::new().await;

    assert_eq!(server.get_as(None, "/group/missing/").await.status(), 404);
    assert_eq!(server.get_as(None, "/nobody/").await.status(), 404);
    assert_eq!(server.get_as(None, "/nobody/1/").await.status(), 404);
}
