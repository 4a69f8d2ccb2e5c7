//! SQLite database operations
//!
//! All database access goes through this module.
//! Uniqueness of likes, follows, group follows and activity rows is
//! enforced by the schema; the toggles here lean on `INSERT OR IGNORE`
//! and `ON CONFLICT` instead of application-level locking.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use super::pagination::{PAGE_SIZE, Page, num_pages, resolve_page};
use crate::error::AppError;

/// Returns true when `error` is a UNIQUE constraint failure
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_error) if db_error.is_unique_violation())
}

/// Columns shared by every annotated post query, up to the viewer bind
const POST_VIEW_HEAD: &str = r#"
    SELECT
        p.id,
        p.text,
        p.pub_date,
        p.image,
        p.author_id,
        u.username AS author_username,
        u.first_name AS author_first_name,
        u.last_name AS author_last_name,
        p.group_id,
        g.title AS group_title,
        g.slug AS group_slug,
        (SELECT COUNT(DISTINCT l.user_id) FROM likes l WHERE l.post_id = p.id) AS num_likes,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS num_comments,
        EXISTS(SELECT 1 FROM likes lv WHERE lv.post_id = p.id AND lv.user_id = "#;

const POST_VIEW_FROM: &str = r#") AS is_liked
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id"#;

const POST_ORDER: &str = " ORDER BY p.pub_date DESC, p.id DESC";

const COMMENT_VIEW_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created
    FROM comments c
    JOIN users u ON u.id = c.author_id"#;

fn push_scope(builder: &mut QueryBuilder<'_, Sqlite>, scope: PostScope) {
    match scope {
        PostScope::All => {}
        PostScope::Group(group_id) => {
            builder.push(" WHERE p.group_id = ").push_bind(group_id);
        }
        PostScope::Author(author_id) => {
            builder.push(" WHERE p.author_id = ").push_bind(author_id);
        }
        PostScope::LikedBy(user_id) => {
            builder
                .push(" WHERE p.id IN (SELECT post_id FROM likes WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        PostScope::FollowedAuthors(user_id) => {
            builder
                .push(" WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        PostScope::FollowedGroups(user_id) => {
            builder
                .push(" WHERE p.group_id IN (SELECT group_id FROM group_follows WHERE user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

fn post_view_builder<'a>(viewer: Viewer) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::<Sqlite>::new(POST_VIEW_HEAD);
    builder.push_bind(viewer.id());
    builder.push(POST_VIEW_FROM);
    builder
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist, enables foreign keys
    /// and runs pending migrations.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a user and return the stored row
    pub async fn insert_user(&self, user: &NewUser) -> Result<User, AppError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, first_name, last_name, email, password_hash, date_joined)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Delete a user; posts, comments, likes and follows cascade
    pub async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Insert a group. Fails with a unique violation if the slug is taken.
    pub async fn insert_group(
        &self,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<Group, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            "INSERT INTO post_groups (title, slug, description) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(title)
        .bind(slug)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn group_slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM post_groups WHERE slug = ?)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    pub async fn get_group(&self, id: i64) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<_, Group>("SELECT * FROM post_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    pub async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<_, Group>("SELECT * FROM post_groups WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, AppError> {
        let groups = sqlx::query_as::<_, Group>("SELECT * FROM post_groups ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(groups)
    }

    /// All groups with `is_followed` relative to the viewer
    pub async fn list_groups_annotated(&self, viewer: Viewer) -> Result<Vec<GroupView>, AppError> {
        let groups = sqlx::query_as::<_, GroupView>(
            r#"
            SELECT g.id, g.title, g.slug, g.description,
                EXISTS(SELECT 1 FROM group_follows f WHERE f.group_id = g.id AND f.user_id = ?) AS is_followed
            FROM post_groups g
            ORDER BY g.id
            "#,
        )
        .bind(viewer.id())
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    pub async fn is_following_group(&self, viewer: Viewer, group_id: i64) -> Result<bool, AppError> {
        let Some(user_id) = viewer.id() else {
            return Ok(false);
        };

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM group_follows WHERE user_id = ? AND group_id = ?)",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Delete a group; its posts keep existing with no group
    pub async fn delete_group(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM post_groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a post; `pub_date` is set here and never changes afterwards
    pub async fn insert_post(&self, post: &NewPost) -> Result<Post, AppError> {
        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (text, pub_date, author_id, group_id, image)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&post.text)
        .bind(Utc::now())
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.image)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn get_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Post by id, only if written by `username`
    pub async fn get_post_by_author(
        &self,
        post_id: i64,
        username: &str,
    ) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.* FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.id = ? AND u.username = ?
            "#,
        )
        .bind(post_id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    /// Update the editable fields of a post
    pub async fn update_post(
        &self,
        id: i64,
        text: &str,
        group_id: Option<i64>,
        image: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE posts SET text = ?, group_id = ?, image = ? WHERE id = ?")
            .bind(text)
            .bind(group_id)
            .bind(image)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a post; comments and likes cascade
    pub async fn delete_post(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Number of posts in a scope
    pub async fn count_posts(&self, scope: PostScope) -> Result<i64, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts p");
        push_scope(&mut builder, scope);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Annotated posts in a scope, newest first, without pagination
    pub async fn list_post_views(
        &self,
        viewer: Viewer,
        scope: PostScope,
    ) -> Result<Vec<PostView>, AppError> {
        let mut builder = post_view_builder(viewer);
        push_scope(&mut builder, scope);
        builder.push(POST_ORDER);

        let posts = builder
            .build_query_as::<PostView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    /// One page of annotated posts, newest first.
    ///
    /// `raw_page` is the unparsed `?page=` value; out-of-range pages clamp.
    pub async fn get_post_page(
        &self,
        viewer: Viewer,
        scope: PostScope,
        raw_page: Option<&str>,
    ) -> Result<Page<PostView>, AppError> {
        let count = self.count_posts(scope).await?;
        let number = resolve_page(raw_page, count);

        let mut builder = post_view_builder(viewer);
        push_scope(&mut builder, scope);
        builder.push(POST_ORDER);
        builder
            .push(" LIMIT ")
            .push_bind(PAGE_SIZE)
            .push(" OFFSET ")
            .push_bind((number - 1) * PAGE_SIZE);

        let items = builder
            .build_query_as::<PostView>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            number,
            num_pages: num_pages(count),
            count,
        })
    }

    /// A single annotated post
    pub async fn get_post_view(
        &self,
        viewer: Viewer,
        post_id: i64,
    ) -> Result<Option<PostView>, AppError> {
        let mut builder = post_view_builder(viewer);
        builder.push(" WHERE p.id = ").push_bind(post_id);

        let post = builder
            .build_query_as::<PostView>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    pub async fn insert_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<Comment, AppError> {
        let created = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (post_id, author_id, text, created) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Comment with author username, only if it belongs to `post_id`
    pub async fn get_comment_view(
        &self,
        post_id: i64,
        id: i64,
    ) -> Result<Option<CommentView>, AppError> {
        let sql = format!("{COMMENT_VIEW_SELECT} WHERE c.post_id = ? AND c.id = ?");
        let comment = sqlx::query_as::<_, CommentView>(&sql)
            .bind(post_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Comments of a post, newest first
    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>, AppError> {
        let sql = format!("{COMMENT_VIEW_SELECT} WHERE c.post_id = ? ORDER BY c.created DESC, c.id DESC");
        let comments = sqlx::query_as::<_, CommentView>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(comments)
    }

    pub async fn update_comment(&self, id: i64, text: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_comment(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Like a post; returns false if the like already existed
    pub async fn insert_like_if_absent(&self, user_id: i64, post_id: i64) -> Result<bool, AppError> {
        let inserted = sqlx::query("INSERT OR IGNORE INTO likes (user_id, post_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(inserted.rows_affected() > 0)
    }

    /// Remove a like; returns false if there was none
    pub async fn delete_like(&self, user_id: i64, post_id: i64) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM likes WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    pub async fn count_likes(&self, post_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Follows
    // =========================================================================

    /// Follow an author; returns false if already following
    pub async fn insert_follow_if_absent(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> Result<bool, AppError> {
        let inserted =
            sqlx::query("INSERT OR IGNORE INTO follows (user_id, author_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(author_id)
                .execute(&self.pool)
                .await?;

        Ok(inserted.rows_affected() > 0)
    }

    /// Unfollow an author; returns false if there was nothing to remove
    pub async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    /// Follow numbers for an author's profile, in one query
    pub async fn get_follow_summary(
        &self,
        viewer: Viewer,
        author_id: i64,
    ) -> Result<FollowSummary, AppError> {
        let summary = sqlx::query_as::<_, FollowSummary>(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM follows WHERE author_id = ? AND user_id = ?) AS follows,
                (SELECT COUNT(*) FROM follows WHERE author_id = ?) AS follower_count,
                (SELECT COUNT(*) FROM follows WHERE user_id = ?) AS following_count,
                (SELECT COUNT(*) FROM group_follows WHERE user_id = ?) AS follower_group_count
            "#,
        )
        .bind(author_id)
        .bind(viewer.id())
        .bind(author_id)
        .bind(author_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    // =========================================================================
    // Group follows
    // =========================================================================

    /// Subscribe to a group; returns false if already subscribed
    pub async fn insert_group_follow_if_absent(
        &self,
        user_id: i64,
        group_id: i64,
    ) -> Result<bool, AppError> {
        let inserted =
            sqlx::query("INSERT OR IGNORE INTO group_follows (user_id, group_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(group_id)
                .execute(&self.pool)
                .await?;

        Ok(inserted.rows_affected() > 0)
    }

    pub async fn delete_group_follow(&self, user_id: i64, group_id: i64) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM group_follows WHERE user_id = ? AND group_id = ?")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    // =========================================================================
    // Activity
    // =========================================================================

    /// Create or update the user's last-seen time
    pub async fn touch_activity(&self, user_id: i64, time: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO activities (user_id, time) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET time = excluded.time
            "#,
        )
        .bind(user_id)
        .bind(time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_activity(&self, user_id: i64) -> Result<Option<Activity>, AppError> {
        let activity = sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(activity)
    }

    /// Last-seen time, `None` if never recorded
    pub async fn get_last_seen(&self, user_id: i64) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self.get_activity(user_id).await?.and_then(|a| a.time))
    }

    // =========================================================================
    // Counting helpers
    // =========================================================================

    /// Row count of a fixed table name; used by tests and metrics
    pub async fn count_rows(&self, table: &'static str) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}
