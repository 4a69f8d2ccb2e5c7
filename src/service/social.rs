//! Social service
//!
//! Likes, author follows and group follows. Creating a relation is
//! insert-if-absent and removing one is an unconditional delete, so
//! repeating either is harmless. The unique pair constraints in the
//! schema keep concurrent duplicates out.

use std::sync::Arc;

use serde::Serialize;

use crate::data::{Database, Group, User};
use crate::error::AppError;
use crate::metrics::RELATION_TOGGLES_TOTAL;

/// Count echoed back to the like button.
///
/// The client sends its displayed count; it is adjusted, not recounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LikeCount {
    Number(i64),
    /// Shown as an empty label
    Blank(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeResponse {
    pub num_likes: LikeCount,
    /// "True" or "False", as the button script expects
    pub is_liked: &'static str,
}

fn displayed_count(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse().ok()).unwrap_or(0)
}

impl LikeResponse {
    pub fn liked(raw_count: Option<&str>) -> Self {
        Self {
            num_likes: LikeCount::Number(displayed_count(raw_count).saturating_add(1)),
            is_liked: "True",
        }
    }

    pub fn unliked(raw_count: Option<&str>) -> Self {
        let count = displayed_count(raw_count).saturating_sub(1);
        Self {
            num_likes: if count == 0 {
                LikeCount::Blank("")
            } else {
                LikeCount::Number(count)
            },
            is_liked: "False",
        }
    }
}

fn record_toggle(kind: &str, action: &str) {
    RELATION_TOGGLES_TOTAL
        .with_label_values(&[kind, action])
        .inc();
}

/// Social service
pub struct SocialService {
    db: Arc<Database>,
}

impl SocialService {
    /// Create new social service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn existing_post(&self, post_id: i64) -> Result<i64, AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
        Ok(post.id)
    }

    async fn author(&self, username: &str) -> Result<User, AppError> {
        self.db
            .get_user_by_username(username)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn group(&self, slug: &str) -> Result<Group, AppError> {
        self.db
            .get_group_by_slug(slug)
            .await?
            .ok_or(AppError::NotFound)
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Like a post. Returns whether a new like was recorded.
    pub async fn like(&self, user: &User, post_id: i64) -> Result<bool, AppError> {
        let post_id = self.existing_post(post_id).await?;
        let created = self.db.insert_like_if_absent(user.id, post_id).await?;
        record_toggle("like", "add");
        tracing::debug!(user_id = user.id, post_id, created, "Like");
        Ok(created)
    }

    /// Remove a like. Not having liked the post is fine.
    pub async fn unlike(&self, user: &User, post_id: i64) -> Result<bool, AppError> {
        let post_id = self.existing_post(post_id).await?;
        let removed = self.db.delete_like(user.id, post_id).await?;
        record_toggle("like", "remove");
        tracing::debug!(user_id = user.id, post_id, removed, "Unlike");
        Ok(removed)
    }

    // =========================================================================
    // Follows
    // =========================================================================

    /// Follow an author. Following yourself is silently skipped.
    pub async fn follow(&self, user: &User, username: &str) -> Result<bool, AppError> {
        let author = self.author(username).await?;
        if author.id == user.id {
            return Ok(false);
        }
        let created = self.db.insert_follow_if_absent(user.id, author.id).await?;
        record_toggle("follow", "add");
        tracing::debug!(user_id = user.id, author_id = author.id, created, "Follow");
        Ok(created)
    }

    pub async fn unfollow(&self, user: &User, username: &str) -> Result<bool, AppError> {
        let author = self.author(username).await?;
        let removed = self.db.delete_follow(user.id, author.id).await?;
        record_toggle("follow", "remove");
        tracing::debug!(user_id = user.id, author_id = author.id, removed, "Unfollow");
        Ok(removed)
    }

    /// Join a group
    pub async fn follow_group(&self, user: &User, slug: &str) -> Result<bool, AppError> {
        let group = self.group(slug).await?;
        let created = self.db.insert_group_follow_if_absent(user.id, group.id).await?;
        record_toggle("group_follow", "add");
        tracing::debug!(user_id = user.id, group_id = group.id, created, "Group follow");
        Ok(created)
    }

    /// Leave a group
    pub async fn unfollow_group(&self, user: &User, slug: &str) -> Result<bool, AppError> {
        let group = self.group(slug).await?;
        let removed = self.db.delete_group_follow(user.id, group.id).await?;
        record_toggle("group_follow", "remove");
        tracing::debug!(user_id = user.id, group_id = group.id, removed, "Group unfollow");
        Ok(removed)
    }
}
