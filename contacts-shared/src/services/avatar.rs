/// Avatar image hosting
///
/// Uploaded avatars are stored with a third-party image host and only the
/// returned URL is kept on the user row. [`CloudinaryImageHost`] talks to
/// the Cloudinary upload API using signed requests.
///
/// # Example
///
/// ```no_run
/// use contacts_shared::services::avatar::{CloudinaryConfig, CloudinaryImageHost, ImageHost, ImageUpload};
///
/// # async fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
/// let host = CloudinaryImageHost::new(CloudinaryConfig {
///     cloud_name: "demo".to_string(),
///     api_key: "123".to_string(),
///     api_secret: "secret".to_string(),
/// })?;
///
/// let url = host
///     .upload(ImageUpload::avatar("me.png", Some("image/png".to_string()), bytes))
///     .await?;
/// println!("Avatar stored at {}", url);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Folder avatars are uploaded into
pub const AVATAR_FOLDER: &str = "avatars";

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Image upload errors
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("Image host request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Image host rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Image host response did not include a URL")]
    MissingUrl,
}

/// A file to store
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub folder: String,
}

impl ImageUpload {
    /// An upload destined for [`AVATAR_FOLDER`]
    pub fn avatar(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
            folder: AVATAR_FOLDER.to_string(),
        }
    }
}

/// Stores images and returns their public URL
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, upload: ImageUpload) -> Result<String, AvatarError>;
}

/// Cloudinary account credentials
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// [`ImageHost`] backed by the Cloudinary upload API
pub struct CloudinaryImageHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryImageHost {
    pub fn new(config: CloudinaryConfig) -> Result<Self, AvatarError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", CLOUDINARY_API_BASE, self.config.cloud_name)
    }
}

#[async_trait]
impl ImageHost for CloudinaryImageHost {
    async fn upload(&self, upload: ImageUpload) -> Result<String, AvatarError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", upload.folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let form = Form::new()
            .text("folder", upload.folder)
            .text("timestamp", timestamp)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part("file", part);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.to_string());

            tracing::warn!(status = status.as_u16(), %message, "Image upload rejected");
            return Err(AvatarError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response.json().await?;
        body.secure_url.ok_or(AvatarError::MissingUrl)
    }
}

/// Signs upload parameters the way the Cloudinary API expects
///
/// Parameters are sorted by name, joined as `k=v&k=v`, suffixed with the
/// API secret, and hashed with SHA-256. The result is lowercase hex.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
