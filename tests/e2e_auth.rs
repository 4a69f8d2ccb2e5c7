//! E2E tests for signup, login, logout and activity tracking

mod common;

use common::{PASSWORD, TestServer, location};

fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("session="))
        .map(|value| value.split(';').next().unwrap_or_default().to_string())
}

#[tokio::test]
async fn test_signup_logs_in() {
    let server = TestServer::new().await;

    let response = server.get_as(None, "/auth/signup/").await;
    assert_eq!(response.status(), 200);

    let response = server
        .post_form_as(
            None,
            "/auth/signup/",
            &[
                ("username", "newbie"),
                ("first_name", "New"),
                ("last_name", "Comer"),
                ("email", "newbie@example.com"),
                ("password1", "long-enough-password"),
                ("password2", "long-enough-password"),
            ],
        )
        .await;
    let cookie = session_cookie(&response).expect("session cookie set");
    assert_eq!(location(&response), "/");
    assert_eq!(server.count("users").await, 1);

    // The new session works for pages that need a login
    let response = server
        .client
        .get(server.url("/new/"))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_signup_rejects_taken_username() {
    let server = TestServer::new().await;
    server.create_user("alice").await;

    let response = server
        .post_form_as(
            None,
            "/auth/signup/",
            &[
                ("username", "alice"),
                ("password1", "long-enough-password"),
                ("password2", "long-enough-password"),
            ],
        )
        .await;
    assert_eq!(response.status(), 200);
    assert!(session_cookie(&response).is_none());
    let body = response.text().await.unwrap();
    assert!(body.contains("A user with that username already exists."));
    assert_eq!(server.count("users").await, 1);
}

#[tokio::test]
async fn test_login_with_bad_password() {
    let server = TestServer::new().await;
    server.create_user("alice").await;

    let response = server
        .post_form_as(
            None,
            "/auth/login/",
            &[("username", "alice"), ("password", "wrong-password")],
        )
        .await;
    assert_eq!(response.status(), 200);
    assert!(session_cookie(&response).is_none());
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("Please enter a correct username and password.")
    );
}

#[tokio::test]
async fn test_login_follows_next() {
    let server = TestServer::new().await;
    server.create_user("alice").await;

    let response = server.get_as(None, "/auth/login/?next=%2Fnew%2F").await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains(r#"value="/new/""#));

    let response = server
        .post_form_as(
            None,
            "/auth/login/",
            &[("username", "alice"), ("password", PASSWORD), ("next", "/new/")],
        )
        .await;
    assert!(session_cookie(&response).is_some());
    assert_eq!(location(&response), "/new/");

    // Off-site targets fall back to the index
    let response = server
        .post_form_as(
            None,
            "/auth/login/",
            &[
                ("username", "alice"),
                ("password", PASSWORD),
                ("next", "//evil.example.com/"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let response = server.get_as(Some(&alice), "/auth/logout/").await;
    assert_eq!(location(&response), "/");
    let cleared = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with("session=") && value.contains("Max-Age=0"));
    assert!(cleared);
}

#[tokio::test]
async fn test_forged_cookie_is_anonymous() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let token = server.token_for(&alice);
    let (payload, _) = token.split_once('.').unwrap();

    let response = server
        .client
        .get(server.url("/new/"))
        .header("Cookie", format!("session={}.bm90LWEtc2lnbmF0dXJl", payload))
        .send()
        .await
        .unwrap();
    assert!(location(&response).starts_with("/auth/login/"));
    assert_eq!(server.count("activities").await, 0);
}

#[tokio::test]
async fn test_activity_is_recorded_once_per_interval() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    assert!(server.state.db.get_last_seen(alice.id).await.unwrap().is_none());

    // A fresh session has never recorded activity
    let response = server.get_as(Some(&alice), "/").await;
    assert_eq!(response.status(), 200);
    let refreshed = session_cookie(&response).expect("session cookie refreshed");
    let first_seen = server
        .state
        .db
        .get_last_seen(alice.id)
        .await
        .unwrap()
        .expect("activity recorded");
    assert_eq!(server.count("activities").await, 1);

    // Within the interval nothing is written and no cookie is issued
    let response = server
        .client
        .get(server.url("/"))
        .header("Cookie", refreshed)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(session_cookie(&response).is_none());
    let last_seen = server.state.db.get_last_seen(alice.id).await.unwrap();
    assert_eq!(last_seen, Some(first_seen));
    assert_eq!(server.count("activities").await, 1);

    // Guests never touch the table
    server.get_as(None, "/").await;
    assert_eq!(server.count("activities").await, 1);
}

#[tokio::test]
async fn test_last_seen_on_profile() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let body = server.get_as(None, "/alice/").await.text().await.unwrap();
    assert!(body.contains("Last seen: Never"));

    server.get_as(Some(&alice), "/").await;
    let body = server.get_as(None, "/alice/").await.text().await.unwrap();
    assert!(body.contains("Last seen: Just now"));
}

#[tokio::test]
async fn test_bearer_activity_is_throttled() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let token = server.token_for(&alice);

    let mut seen = Vec::new();
    for _ in 0..3 {
        let response = server
            .client
            .get(server.url("/api/v1/posts/"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(session_cookie(&response).is_none());
        seen.push(server.state.db.get_last_seen(alice.id).await.unwrap());
    }

    assert!(seen[0].is_some());
    assert_eq!(seen[1], seen[0]);
    assert_eq!(seen[2], seen[0]);
    assert_eq!(server.count("activities").await, 1);
}
