//! Feed service
//!
//! Read side of the posts app: paginated listings, profiles and the
//! single-post view, all annotated relative to the viewer.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::data::{
    CommentView, Database, FollowSummary, Group, GroupView, Page, PostScope, PostView, User,
    Viewer,
};
use crate::error::AppError;

/// A group page
pub struct GroupFeed {
    pub group: Group,
    pub is_followed: bool,
    pub page: Page<PostView>,
}

/// A profile page
pub struct Profile {
    pub author: User,
    pub follow: FollowSummary,
    pub last_seen: Option<DateTime<Utc>>,
    pub page: Page<PostView>,
}

/// A single post with everything shown around it
pub struct PostDetail {
    pub post: PostView,
    pub author: User,
    pub comments: Vec<CommentView>,
    pub follow: FollowSummary,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Feed service
pub struct FeedService {
    db: Arc<Database>,
}

impl FeedService {
    /// Create new feed service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Every post, newest first
    pub async fn index(&self, viewer: Viewer, raw_page: Option<&str>) -> Result<Page<PostView>, AppError> {
        self.db.get_post_page(viewer, PostScope::All, raw_page).await
    }

    /// Posts in one group; unknown slug is `NotFound`
    pub async fn group(
        &self,
        viewer: Viewer,
        slug: &str,
        raw_page: Option<&str>,
    ) -> Result<GroupFeed, AppError> {
        let group = self
            .db
            .get_group_by_slug(slug)
            .await?
            .ok_or(AppError::NotFound)?;
        let is_followed = self.db.is_following_group(viewer, group.id).await?;
        let page = self
            .db
            .get_post_page(viewer, PostScope::Group(group.id), raw_page)
            .await?;

        Ok(GroupFeed {
            group,
            is_followed,
            page,
        })
    }

    /// All groups with the viewer's membership flag
    pub async fn groups_overview(&self, viewer: Viewer) -> Result<Vec<GroupView>, AppError> {
        self.db.list_groups_annotated(viewer).await
    }

    /// Author page: their posts, follow numbers and last-seen time
    pub async fn profile(
        &self,
        viewer: Viewer,
        username: &str,
        raw_page: Option<&str>,
    ) -> Result<Profile, AppError> {
        let author = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or(AppError::NotFound)?;
        let page = self
            .db
            .get_post_page(viewer, PostScope::Author(author.id), raw_page)
            .await?;
        let follow = self.db.get_follow_summary(viewer, author.id).await?;
        let last_seen = self.db.get_last_seen(author.id).await?;

        Ok(Profile {
            author,
            follow,
            last_seen,
            page,
        })
    }

    /// One post, addressed by its author's username and its id.
    /// A post under the wrong username is `NotFound`.
    pub async fn post_detail(
        &self,
        viewer: Viewer,
        username: &str,
        post_id: i64,
    ) -> Result<PostDetail, AppError> {
        let post = self
            .db
            .get_post_view(viewer, post_id)
            .await?
            .filter(|post| post.author_username == username)
            .ok_or(AppError::NotFound)?;
        let author = self
            .db
            .get_user(post.author_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let comments = self.db.list_comments(post.id).await?;
        let follow = self.db.get_follow_summary(viewer, author.id).await?;
        let last_seen = self.db.get_last_seen(author.id).await?;

        Ok(PostDetail {
            post,
            author,
            comments,
            follow,
            last_seen,
        })
    }

    /// Posts by authors the user follows
    pub async fn follow_index(&self, user: &User, raw_page: Option<&str>) -> Result<Page<PostView>, AppError> {
        self.db
            .get_post_page(Viewer::User(user.id), PostScope::FollowedAuthors(user.id), raw_page)
            .await
    }

    /// Posts in groups the user follows
    pub async fn follow_groups(&self, user: &User, raw_page: Option<&str>) -> Result<Page<PostView>, AppError> {
        self.db
            .get_post_page(Viewer::User(user.id), PostScope::FollowedGroups(user.id), raw_page)
            .await
    }

    /// Posts the user liked
    pub async fn liked(&self, user: &User, raw_page: Option<&str>) -> Result<Page<PostView>, AppError> {
        self.db
            .get_post_page(Viewer::User(user.id), PostScope::LikedBy(user.id), raw_page)
            .await
    }
}
