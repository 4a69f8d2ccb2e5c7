//! REST request and response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{CommentView, Group, PostView, User};
use crate::storage::MediaStorage;

/// User response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Group response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupResponse {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<&Group> for GroupResponse {
    fn from(group: &Group) -> Self {
        Self {
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        }
    }
}

/// Post response. `author` is the author's username, `image` a public URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: String,
    pub image: Option<String>,
}

impl PostResponse {
    pub fn from_view(post: &PostView, storage: &MediaStorage) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author: post.author_username.clone(),
            image: post.image.as_deref().map(|key| storage.get_public_url(key)),
        }
    }
}

/// Post create/update request
///
/// `author` and `id` are never read from the body. `image` is base64,
/// optionally as a `data:` URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostRequest {
    pub text: Option<String>,
    pub group: Option<i64>,
    pub image: Option<String>,
}

/// Comment response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub author: String,
    pub post: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

impl From<&CommentView> for CommentResponse {
    fn from(comment: &CommentView) -> Self {
        Self {
            id: comment.id,
            author: comment.author_username.clone(),
            post: comment.post_id,
            text: comment.text.clone(),
            created: comment.created,
        }
    }
}

/// Comment create/update request; the post comes from the URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentRequest {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
