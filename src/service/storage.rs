// service/storage.rs
use aws_sdk_s3::{primitives::ByteStream, Client};
use serde::Deserialize;
use uuid::Uuid;

use crate::{config::Config, service::error::ServiceError};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Task,
    Avatar,
}

impl UploadKind {
    pub fn prefix(&self) -> &str {
        match self {
            UploadKind::Task => "tasks",
            UploadKind::Avatar => "avatars",
        }
    }
}

/// File extension for an accepted image content type.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

pub fn object_key(kind: UploadKind, owner_id: Uuid, extension: &str) -> String {
    format!("{}/{}/{}.{}", kind.prefix(), owner_id, Uuid::new_v4(), extension)
}

/// Object storage for task images and avatars. Disabled when no bucket is
/// configured.
#[derive(Debug, Clone)]
pub struct StorageService {
    client: Option<Client>,
    bucket: String,
    public_url: String,
}

impl StorageService {
    pub fn disabled() -> Self {
        Self {
            client: None,
            bucket: String::new(),
            public_url: String::new(),
        }
    }

    pub async fn from_config(config: &Config) -> Self {
        let Some(bucket) = config.storage_bucket.clone() else {
            tracing::info!("STORAGE_BUCKET not set - uploads disabled");
            return Self::disabled();
        };

        let shared = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.storage_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        let public_url = config
            .storage_public_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", bucket));

        tracing::info!("Object storage enabled (bucket: {})", bucket);
        Self {
            client: Some(client),
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn public_url_for(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_url, encoded.join("/"))
    }

    /// Stores `body` and returns its public URL.
    pub async fn upload(
        &self,
        kind: UploadKind,
        owner_id: Uuid,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, ServiceError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ServiceError::Storage("Storage is not configured".to_string()))?;

        let extension = image_extension(content_type).ok_or_else(|| {
            ServiceError::Validation("Only JPEG, PNG, WebP and GIF images are accepted".to_string())
        })?;
        if body.is_empty() {
            return Err(ServiceError::Validation("Upload is empty".to_string()));
        }
        if body.len() > MAX_UPLOAD_BYTES {
            return Err(ServiceError::Validation("Upload exceeds 5 MiB".to_string()));
        }

        let key = object_key(kind, owner_id, extension);
        client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        tracing::debug!("Stored upload {} in {}", key, self.bucket);
        Ok(self.public_url_for(&key))
    }
}
