//! Common test utilities for E2E tests

#![allow(dead_code)]

use postwall::data::{Group, NewPost, Post, User};
use postwall::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const PASSWORD: &str = "correct-horse-battery";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    /// Client that does not follow redirects
    pub client: reqwest::Client,
}

pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        media: config::MediaConfig {
            backend: config::MediaBackend::Local,
            root: temp_dir.path().join("media"),
            public_url: "/media".to_string(),
            bucket: None,
        },
        cloudflare: None,
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 604800,
        },
        activity: config::ActivityConfig {
            interval_seconds: 300,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        postwall::metrics::init_metrics();
        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = postwall::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get full URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a user directly in the database
    pub async fn create_user(&self, username: &str) -> User {
        use postwall::data::NewUser;

        self.state
            .db
            .insert_user(&NewUser {
                username: username.to_string(),
                first_name: username.to_uppercase(),
                last_name: "Tester".to_string(),
                email: format!("{}@example.com", username),
                password_hash: postwall::auth::hash_password(PASSWORD).unwrap(),
            })
            .await
            .unwrap()
    }

    /// Signed session token for a user
    pub fn token_for(&self, user: &User) -> String {
        use postwall::auth::{Session, create_session_token};

        let session = Session::new(user, self.state.config.auth.session_max_age);
        create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }

    /// `Cookie` header value logging the user in
    pub fn cookie_for(&self, user: &User) -> String {
        format!("session={}", self.token_for(user))
    }

    pub async fn get_as(&self, user: Option<&User>, path: &str) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(user) = user {
            request = request.header("Cookie", self.cookie_for(user));
        }
        request.send().await.unwrap()
    }

    pub async fn post_form_as(
        &self,
        user: Option<&User>,
        path: &str,
        form: &[(&str, &str)],
    ) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).form(form);
        if let Some(user) = user {
            request = request.header("Cookie", self.cookie_for(user));
        }
        request.send().await.unwrap()
    }

    pub async fn post_multipart_as(
        &self,
        user: Option<&User>,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).multipart(form);
        if let Some(user) = user {
            request = request.header("Cookie", self.cookie_for(user));
        }
        request.send().await.unwrap()
    }

    pub async fn create_group(&self, title: &str, slug: &str) -> Group {
        self.state
            .db
            .insert_group(title, slug, &format!("About {}", title))
            .await
            .unwrap()
    }

    pub async fn create_post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        self.state
            .db
            .insert_post(&NewPost {
                text: text.to_string(),
                author_id: author.id,
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .unwrap()
    }

    pub async fn count(&self, table: &'static str) -> i64 {
        self.state.db.count_rows(table).await.unwrap()
    }
}

/// Location header of a redirect response
pub fn location(response: &reqwest::Response) -> String {
    assert!(
        response.status().is_redirection(),
        "expected a redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

/// A small PNG image
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
    buffer.into_inner()
}
