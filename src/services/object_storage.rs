//! Object storage for member photos

use crate::config::{PHOTO_KEY_PLACEHOLDER, StorageConfig};
use crate::core::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// One object to write
#[derive(Debug, Clone, PartialEq)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub acl: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, object: PutObject) -> ServiceResult<()>;
}

/// Object storage kept in memory, for tests and development
#[derive(Clone, Default)]
pub struct InMemoryObjectStorage {
    objects: Arc<RwLock<HashMap<(String, String), PutObject>>>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object stored under `bucket`/`key`
    pub fn get(&self, bucket: &str, key: &str) -> Option<PutObject> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(&(bucket.to_string(), key.to_string())).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put_object(&self, object: PutObject) -> ServiceResult<()> {
        let mut objects = self.objects.write().map_err(|e| {
            ServiceError::external("object storage", format!("failed to acquire write lock: {}", e))
        })?;
        objects.insert((object.bucket.clone(), object.key.clone()), object);
        Ok(())
    }
}

#[cfg(feature = "s3")]
pub use s3::S3ObjectStorage;

#[cfg(feature = "s3")]
mod s3 {
    use super::{ObjectStorage, PutObject};
    use crate::core::error::{ServiceError, ServiceResult};
    use async_trait::async_trait;
    use aws_config::BehaviorVersion;
    use aws_sdk_s3::Client;
    use aws_sdk_s3::error::DisplayErrorContext;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::ObjectCannedAcl;

    /// Amazon S3 implementation of ObjectStorage
    #[derive(Clone)]
    pub struct S3ObjectStorage {
        client: Client,
    }

    impl S3ObjectStorage {
        pub fn new(client: Client) -> Self {
            Self { client }
        }

        /// Build a client from the ambient AWS configuration
        pub async fn from_env() -> Self {
            let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            Self::new(Client::new(&sdk_config))
        }
    }

    #[async_trait]
    impl ObjectStorage for S3ObjectStorage {
        async fn put_object(&self, object: PutObject) -> ServiceResult<()> {
            let mut request = self
                .client
                .put_object()
                .bucket(&object.bucket)
                .key(&object.key)
                .content_type(&object.content_type)
                .body(ByteStream::from(object.body));
            if let Some(acl) = &object.acl {
                request = request.acl(ObjectCannedAcl::from(acl.as_str()));
            }
            for (name, value) in &object.metadata {
                request = request.metadata(name, value);
            }

            request
                .send()
                .await
                .map_err(|e| ServiceError::external("s3", DisplayErrorContext(&e)))?;
            tracing::debug!(bucket = %object.bucket, key = %object.key, "object stored");
            Ok(())
        }
    }
}

/// Uploads member photos and computes their public URL
#[derive(Clone)]
pub struct PhotoUploader {
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
    acl: Option<String>,
    url_template: String,
}

impl PhotoUploader {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: &StorageConfig) -> ServiceResult<Self> {
        if !config.photo_url_template.contains(PHOTO_KEY_PLACEHOLDER) {
            return Err(ServiceError::Config(format!(
                "photo URL template must contain '{}'",
                PHOTO_KEY_PLACEHOLDER
            )));
        }
        Ok(Self {
            storage,
            bucket: config.photo_bucket.clone(),
            acl: config.photo_acl.clone(),
            url_template: config.photo_url_template.clone(),
        })
    }

    /// Random unique object key keeping the extension of `file_name`
    pub fn object_key(file_name: &str) -> String {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty());
        match extension {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        }
    }

    /// Public URL of the object stored under `key`
    pub fn public_url(&self, key: &str) -> ServiceResult<String> {
        let mut context = tera::Context::new();
        context.insert("key", key);
        tera::Tera::one_off(&self.url_template, &context, false)
            .map_err(|e| ServiceError::Config(format!("invalid photo URL template: {}", e)))
    }

    /// Store a photo under a fresh key, returning its public URL
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        body: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> ServiceResult<String> {
        let key = Self::object_key(file_name);
        self.storage
            .put_object(PutObject {
                bucket: self.bucket.clone(),
                key: key.clone(),
                body,
                content_type: content_type.to_string(),
                acl: self.acl.clone(),
                metadata,
            })
            .await?;
        tracing::info!(bucket = %self.bucket, key = %key, "photo uploaded");
        self.public_url(&key)
    }
}
