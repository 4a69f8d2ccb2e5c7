//! Posting service
//!
//! Write side of the posts app: posts, comments and groups. Form
//! problems come back as `Ok(Err(FieldErrors))` so handlers can render
//! them next to the form; `Err(AppError)` is reserved for real failures.

use std::sync::Arc;

use crate::data::{Comment, Database, Group, NewPost, Post, User, is_unique_violation};
use crate::error::AppError;
use crate::forms::{CleanPost, CommentForm, FieldErrors, GROUP_EXISTS_MESSAGE, GroupForm, PostForm};
use crate::metrics::{COMMENTS_CREATED_TOTAL, GROUPS_CREATED_TOTAL, POSTS_CREATED_TOTAL};
use crate::storage::MediaStorage;

fn group_exists() -> FieldErrors {
    FieldErrors::single("title", GROUP_EXISTS_MESSAGE)
}

pub type FormResult<T> = Result<Result<T, FieldErrors>, AppError>;

/// Posting service
pub struct PostService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl PostService {
    /// Create new posting service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    /// Validate, crop and store the image, if any. Returns the storage key.
    async fn clean_and_store(&self, form: &PostForm) -> FormResult<(CleanPost, Option<String>)> {
        let groups = self.db.list_groups().await?;
        let clean = match form.validate(&groups).and_then(CleanPost::apply_crop) {
            Ok(clean) => clean,
            Err(errors) => return Ok(Err(errors)),
        };

        let key = match &clean.image {
            Some(image) => Some(self.storage.upload_post_image(image).await?),
            None => None,
        };
        Ok(Ok((clean, key)))
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Publish a post as `author`
    pub async fn create_post(&self, author: &User, form: &PostForm) -> FormResult<Post> {
        let (clean, image) = match self.clean_and_store(form).await? {
            Ok(stored) => stored,
            Err(errors) => return Ok(Err(errors)),
        };

        let inserted = self
            .db
            .insert_post(&NewPost {
                text: clean.text,
                author_id: author.id,
                group_id: clean.group_id,
                image: image.clone(),
            })
            .await;
        let post = self.discard_on_error(inserted, image.as_deref()).await?;

        POSTS_CREATED_TOTAL.inc();
        tracing::info!(post_id = post.id, author_id = author.id, "Post created");
        Ok(Ok(post))
    }

    /// The post `post_id` if `username` wrote it
    pub async fn find_post(&self, username: &str, post_id: i64) -> Result<Post, AppError> {
        self.db
            .get_post_by_author(post_id, username)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Replace text and group; a new image replaces the old one, no
    /// image keeps it. Ownership is checked by the caller.
    pub async fn update_post(&self, post: &Post, form: &PostForm) -> FormResult<Post> {
        let (clean, new_image) = match self.clean_and_store(form).await? {
            Ok(stored) => stored,
            Err(errors) => return Ok(Err(errors)),
        };

        let image = new_image.as_deref().or(post.image.as_deref());
        let updated = self
            .db
            .update_post(post.id, &clean.text, clean.group_id, image)
            .await;
        self.discard_on_error(updated, new_image.as_deref()).await?;

        if let (Some(_), Some(old)) = (&new_image, &post.image) {
            self.remove_image(old).await;
        }

        tracing::info!(post_id = post.id, "Post updated");
        Ok(Ok(Post {
            text: clean.text,
            group_id: clean.group_id,
            image: image.map(str::to_string),
            ..post.clone()
        }))
    }

    /// Delete a post and its stored image
    pub async fn delete_post(&self, post: &Post) -> Result<(), AppError> {
        self.db.delete_post(post.id).await?;
        if let Some(key) = &post.image {
            self.remove_image(key).await;
        }
        tracing::info!(post_id = post.id, "Post deleted");
        Ok(())
    }

    async fn remove_image(&self, key: &str) {
        if let Err(error) = self.storage.delete(key).await {
            tracing::warn!(%error, key = %key, "Failed to delete post image");
        }
    }

    /// A freshly uploaded image whose row was not written is deleted again
    async fn discard_on_error<T>(
        &self,
        result: Result<T, AppError>,
        uploaded: Option<&str>,
    ) -> Result<T, AppError> {
        if result.is_err() {
            if let Some(key) = uploaded {
                self.remove_image(key).await;
            }
        }
        result
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Comment on a post
    pub async fn create_comment(
        &self,
        author: &User,
        post_id: i64,
        form: &CommentForm,
    ) -> FormResult<Comment> {
        let text = match form.validate() {
            Ok(text) => text,
            Err(errors) => return Ok(Err(errors)),
        };

        let comment = self.db.insert_comment(post_id, author.id, &text).await?;
        COMMENTS_CREATED_TOTAL.inc();
        tracing::info!(comment_id = comment.id, post_id, author_id = author.id, "Comment added");
        Ok(Ok(comment))
    }

    /// Comment from the post page. Unknown post is `NotFound`; an
    /// invalid comment is dropped.
    pub async fn add_comment(
        &self,
        author: &User,
        username: &str,
        post_id: i64,
        form: &CommentForm,
    ) -> Result<(), AppError> {
        let post = self.find_post(username, post_id).await?;
        if let Err(errors) = self.create_comment(author, post.id, form).await? {
            tracing::debug!(%errors, post_id, "Ignored invalid comment");
        }
        Ok(())
    }

    /// Remove a comment if `user` wrote it. Unknown comment is
    /// `NotFound`; someone else's comment is left alone.
    pub async fn remove_comment(&self, user: &User, comment_id: i64) -> Result<bool, AppError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if comment.author_id != user.id {
            return Ok(false);
        }

        self.db.delete_comment(comment.id).await?;
        tracing::info!(comment_id, "Comment deleted");
        Ok(true)
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Create a group; a title whose slug is taken is a title error.
    pub async fn create_group(&self, form: &GroupForm) -> FormResult<Group> {
        let clean = match form.validate() {
            Ok(clean) => clean,
            Err(errors) => return Ok(Err(errors)),
        };
        if self.db.group_slug_exists(&clean.slug).await? {
            return Ok(Err(group_exists()));
        }

        match self
            .db
            .insert_group(&clean.title, &clean.slug, &clean.description)
            .await
        {
            Ok(group) => {
                GROUPS_CREATED_TOTAL.inc();
                tracing::info!(group_id = group.id, slug = %group.slug, "Group created");
                Ok(Ok(group))
            }
            // Lost a race with another request creating the same slug
            Err(e) if is_unique_violation(&e) => Ok(Err(group_exists())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::forms::Upload;

    fn png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 120, 200]));
        let mut buffer = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[tokio::test]
    async fn failed_insert_removes_uploaded_image() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db")).await.unwrap();
        let media = temp_dir.path().join("media");
        let service = PostService::new(
            Arc::new(db),
            Arc::new(MediaStorage::local(media.clone(), "/media")),
        );

        // No such row in users, so the foreign key rejects the insert
        let ghost = User {
            id: 999,
            username: "ghost".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: "ghost@example.com".to_string(),
            password_hash: String::new(),
            date_joined: Utc::now(),
        };
        let form = PostForm {
            text: "with picture".to_string(),
            group: None,
            image: Some(Upload {
                filename: "pic.png".to_string(),
                content_type: Some("image/png".to_string()),
                data: png(),
            }),
            crop_data: None,
        };

        assert!(service.create_post(&ghost, &form).await.is_err());

        let leftover = match std::fs::read_dir(media.join("posts")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        };
        assert_eq!(leftover, 0);
    }
}
