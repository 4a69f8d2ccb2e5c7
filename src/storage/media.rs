//! Media storage backends
//!
//! Handles upload, delete, and URL generation for post images.

use std::path::{Component, Path, PathBuf};

use aws_sdk_s3::Client as S3Client;

use crate::config::{CloudflareConfig, MediaBackend, MediaConfig};
use crate::error::AppError;
use crate::forms::ValidImage;
use crate::metrics::MEDIA_UPLOADS_TOTAL;

enum Backend {
    /// Files under a directory on this machine
    Local { root: PathBuf },
    /// S3-compatible client for R2
    R2 { client: S3Client, bucket: String },
}

/// Media storage service
///
/// Stores files under a key such as `posts/<ulid>.png` and maps keys
/// to public URLs. Keys are what the database stores.
pub struct MediaStorage {
    backend: Backend,
    /// Public URL base, e.g. "/media" or "https://media.example.com"
    public_url: String,
}

impl MediaStorage {
    /// Create the storage backend selected by configuration
    ///
    /// # Errors
    /// Returns error if the local directory cannot be created or the R2
    /// settings are incomplete
    pub async fn new(
        config: &MediaConfig,
        cloudflare: Option<&CloudflareConfig>,
    ) -> Result<Self, AppError> {
        let backend = match config.backend {
            MediaBackend::Local => {
                tokio::fs::create_dir_all(&config.root).await.map_err(|e| {
                    AppError::Storage(format!(
                        "Failed to create media directory {}: {}",
                        config.root.display(),
                        e
                    ))
                })?;
                Backend::Local {
                    root: config.root.clone(),
                }
            }
            MediaBackend::R2 => {
                let cloudflare = cloudflare.ok_or_else(|| {
                    AppError::Config("R2 media backend requires [cloudflare] settings".to_string())
                })?;
                let bucket = config.bucket.clone().ok_or_else(|| {
                    AppError::Config("R2 media backend requires media.bucket".to_string())
                })?;
                Backend::R2 {
                    client: r2_client(cloudflare),
                    bucket,
                }
            }
        };

        Ok(Self {
            backend,
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }

    /// Local storage rooted at `root`, served under `public_url`
    pub fn local(root: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            backend: Backend::Local { root: root.into() },
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload media file
    ///
    /// # Returns
    /// Public URL for the uploaded file
    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        match &self.backend {
            Backend::Local { root } => {
                let path = local_path(root, key)?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| AppError::Storage(format!("Local upload failed: {}", e)))?;
                }
                tokio::fs::write(&path, data)
                    .await
                    .map_err(|e| AppError::Storage(format!("Local upload failed: {}", e)))?;
            }
            Backend::R2 { client, bucket } => {
                use aws_sdk_s3::primitives::ByteStream;

                client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(data))
                    .content_type(content_type)
                    .cache_control("public, max-age=31536000") // 1 year
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;
            }
        }

        MEDIA_UPLOADS_TOTAL.inc();
        Ok(self.get_public_url(key))
    }

    /// Upload a post image under the `posts/` prefix
    ///
    /// # Returns
    /// Storage key of the new file
    pub async fn upload_post_image(&self, image: &ValidImage) -> Result<String, AppError> {
        let key = format!("posts/{}.{}", ulid::Ulid::new().to_string().to_lowercase(), image.extension());
        self.upload(&key, image.data.clone(), image.content_type())
            .await?;
        tracing::debug!(key = %key, width = image.width, height = image.height, "Stored post image");
        Ok(key)
    }

    /// Delete media file. Missing files are not an error.
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Local { root } => {
                let path = local_path(root, key)?;
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(AppError::Storage(format!("Local delete failed: {}", e))),
                }
            }
            Backend::R2 { client, bucket } => {
                client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("R2 delete failed: {}", e)))?;
                Ok(())
            }
        }
    }

    /// Get public URL for a key
    pub fn get_public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    /// Directory to serve under the public URL, for the local backend
    pub fn local_root(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Local { root } => Some(root),
            Backend::R2 { .. } => None,
        }
    }
}

fn r2_client(cloudflare: &CloudflareConfig) -> S3Client {
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    // R2 endpoint: https://{account_id}.r2.cloudflarestorage.com
    let endpoint = format!("https://{}.r2.cloudflarestorage.com", cloudflare.account_id);

    let credentials = Credentials::new(
        &cloudflare.r2_access_key_id,
        &cloudflare.r2_secret_access_key,
        None,
        None,
        "postwall-r2",
    );

    let s3_config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("auto"))
        .endpoint_url(&endpoint)
        .credentials_provider(credentials)
        .http_client(super::build_r2_http_client())
        .build();

    S3Client::from_conf(s3_config)
}

/// Resolve a key below the local root, refusing anything that escapes it.
fn local_path(root: &Path, key: &str) -> Result<PathBuf, AppError> {
    let relative = Path::new(key);
    let safe = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !safe || key.is_empty() {
        return Err(AppError::Storage(format!("Invalid media key: {}", key)));
    }
    Ok(root.join(relative))
}
