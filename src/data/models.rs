//! Data models
//!
//! Rust structs representing database rows and the annotated
//! read models built on top of them. Integer IDs, chrono timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Viewer
// =============================================================================

/// Who is looking at a page or calling an endpoint.
///
/// Passed explicitly through every annotated query; an anonymous viewer
/// never matches a like/follow row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(i64),
}

impl Viewer {
    pub fn id(&self) -> Option<i64> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "First Last", falling back to the username
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Data for inserting a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// A community posts may belong to
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post as stored
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i64,
    pub group_id: Option<i64>,
    /// Media storage key, e.g. "posts/01HV....png"
    pub image: Option<String>,
}

/// Data for inserting a post; `pub_date` is set by the database layer
#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// A comment as stored
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// Last-seen row, one per user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: i64,
    pub user_id: i64,
    pub time: Option<DateTime<Utc>>,
}

// =============================================================================
// Annotated read models
// =============================================================================

/// A post joined with its author and group, plus derived counts
/// relative to a viewer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub author_id: i64,
    pub author_username: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    /// Distinct users who liked the post
    pub num_likes: i64,
    /// Whether the viewer liked it (false for anonymous viewers)
    pub is_liked: bool,
    pub num_comments: i64,
}

/// A comment joined with its author's username
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// A group annotated with whether the viewer follows it
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_followed: bool,
}

/// Relationship numbers shown next to an author
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FollowSummary {
    /// Whether the viewer follows the author
    pub follows: bool,
    /// Users following the author
    pub follower_count: i64,
    /// Users the author follows
    pub following_count: i64,
    /// Groups the author follows
    pub follower_group_count: i64,
}

/// Which posts a listing contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Every post
    All,
    /// Posts in one group
    Group(i64),
    /// Posts written by one user
    Author(i64),
    /// Posts the given user liked
    LikedBy(i64),
    /// Posts by authors the given user follows
    FollowedAuthors(i64),
    /// Posts in groups the given user follows
    FollowedGroups(i64),
}
