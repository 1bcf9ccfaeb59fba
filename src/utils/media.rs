//! Media upload service.
//!
//! Uploaded files first land in a temp directory; a `MediaUploader` moves
//! them to their final home and hands back a public URL.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
}

#[derive(Debug)]
pub enum MediaError {
    Io(std::io::Error),
    Http(reqwest::Error),
    /// The remote service answered, but not with a usable upload.
    Rejected(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Io(e) => write!(f, "media I/O failed: {}", e),
            MediaError::Http(e) => write!(f, "media upload request failed: {}", e),
            MediaError::Rejected(msg) => write!(f, "media upload rejected: {}", msg),
        }
    }
}

impl std::error::Error for MediaError {}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Io(err)
    }
}

impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        MediaError::Http(err)
    }
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Stores the file at `local_path` and returns where it can be fetched.
    async fn store(&self, local_path: &Path) -> Result<UploadedMedia, MediaError>;

    /// Uploads and then always deletes the local temp file.
    /// Failures are logged and reported as `None`.
    async fn upload(&self, local_path: &Path) -> Option<UploadedMedia> {
        let result = self.store(local_path).await;
        discard_temp_file(local_path).await;

        match result {
            Ok(media) => {
                tracing::info!("File uploaded: {}", media.url);
                Some(media)
            }
            Err(e) => {
                tracing::error!("Upload of {} failed: {}", local_path.display(), e);
                None
            }
        }
    }
}

/// Removes a temp file, ignoring files that are already gone.
pub async fn discard_temp_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!("Could not remove temp file {}: {}", path.display(), e);
    }
}

/// Fresh file name that keeps the original extension, if any.
pub fn unique_file_name(original: Option<&str>) -> String {
    let extension = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
        None => Uuid::new_v4().to_string(),
    }
}

/// Keeps media on the local disk; the router serves `dir` publicly.
pub struct LocalMediaStore {
    dir: PathBuf,
    public_url: String,
}

impl LocalMediaStore {
    pub fn new(dir: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MediaUploader for LocalMediaStore {
    async fn store(&self, local_path: &Path) -> Result<UploadedMedia, MediaError> {
        if !tokio::fs::try_exists(local_path).await? {
            return Err(MediaError::Rejected(format!(
                "{} does not exist",
                local_path.display()
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let name = unique_file_name(local_path.file_name().and_then(|n| n.to_str()));
        tokio::fs::copy(local_path, self.dir.join(&name)).await?;

        Ok(UploadedMedia {
            url: format!("{}/{}", self.public_url, name),
        })
    }
}

/// Signed uploads to Cloudinary's `auto/upload` endpoint.
pub struct CloudinaryUploader {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Deserialize)]
struct CloudinaryReply {
    secure_url: Option<String>,
    url: Option<String>,
    error: Option<CloudinaryFailure>,
}

#[derive(Deserialize)]
struct CloudinaryFailure {
    message: String,
}

impl CloudinaryUploader {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            cloud_name,
            api_key,
            api_secret,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/auto/upload",
            self.cloud_name
        )
    }
}

/// Signature over the sorted upload parameters followed by the API secret.
pub fn sign_upload(timestamp: i64, api_secret: &str) -> String {
    hex::encode(Sha256::digest(format!("timestamp={timestamp}{api_secret}")))
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn store(&self, local_path: &Path) -> Result<UploadedMedia, MediaError> {
        let bytes = tokio::fs::read(local_path).await?;
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = Utc::now().timestamp();
        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name))
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature_algorithm", "sha256")
            .text("signature", sign_upload(timestamp, &self.api_secret));

        let reply: CloudinaryReply = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        if let Some(failure) = reply.error {
            return Err(MediaError::Rejected(failure.message));
        }

        reply
            .secure_url
            .or(reply.url)
            .map(|url| UploadedMedia { url })
            .ok_or_else(|| MediaError::Rejected("reply carried no url".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_extension_only() {
        assert!(unique_file_name(Some("me.PNG")).ends_with(".png"));
        assert!(!unique_file_name(Some("archive")).contains('.'));
        assert!(!unique_file_name(Some("x.p/ng")).contains('/'));
        assert!(!unique_file_name(None).contains('.'));
    }

    #[test]
    fn signature_is_hex_sha256() {
        let signature = sign_upload(1_700_000_000, "secret");
        assert_eq!(signature.len(), 64);
        assert_eq!(signature, sign_upload(1_700_000_000, "secret"));
        assert_ne!(signature, sign_upload(1_700_000_001, "secret"));
    }

    #[tokio::test]
    async fn local_upload_copies_and_discards_temp_file() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("avatar.png");
        tokio::fs::write(&source, b"png-bytes").await.unwrap();

        let store = LocalMediaStore::new(temp.path().join("media"), "http://cdn.test/media/");
        let media = store.upload(&source).await.unwrap();

        assert!(media.url.starts_with("http://cdn.test/media/"));
        assert!(media.url.ends_with(".png"));
        assert!(!source.exists());

        let name = media.url.rsplit('/').next().unwrap();
        let copied = tokio::fs::read(store.dir().join(name)).await.unwrap();
        assert_eq!(copied, b"png-bytes");
    }

    #[tokio::test]
    async fn missing_file_uploads_as_none() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(temp.path().join("media"), "http://cdn.test/media");
        assert!(store.upload(&temp.path().join("nope.png")).await.is_none());
    }
}
