//! Aliyun OSS provider / 阿里云OSS存储提供者
//!
//! The backend client is built lazily from the configuration on first use
//! and then shared by every call until the provider is reconfigured.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::storage::{
    normalize_object_name, IoResultExt, MimeGuessLookup, MimeLookup, ObjectMetadata,
    ObjectWrapper, StorageError, StorageResult, StreamStorageProvider,
};
use crate::utils::get_ext;
use super::client::{ObjectClient, OssMetadata};
use super::config::OssConfig;
use super::metadata::{map_object_to_oss, map_oss_to_object};
use super::s3_client::S3ObjectClient;

pub const PROVIDER_NAME: &str = "aliyun.oss";

/// Aliyun OSS provider
pub struct AliyunOssProvider {
    config: OssConfig,
    client: Arc<Mutex<Option<Arc<dyn ObjectClient>>>>,
    mime: Arc<dyn MimeLookup>,
}

impl Default for AliyunOssProvider {
    fn default() -> Self {
        Self {
            config: OssConfig::default(),
            client: Arc::new(Mutex::new(None)),
            mime: Arc::new(MimeGuessLookup),
        }
    }
}

impl AliyunOssProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure with an already built client instead of the rust-s3 one
    pub fn with_client(config: &HashMap<String, String>, client: Arc<dyn ObjectClient>) -> Self {
        Self {
            config: OssConfig::from_map(config),
            client: Arc::new(Mutex::new(Some(client))),
            mime: Arc::new(MimeGuessLookup),
        }
    }

    pub fn with_mime_lookup(mut self, mime: Arc<dyn MimeLookup>) -> Self {
        self.mime = mime;
        self
    }

    pub fn config(&self) -> &OssConfig {
        &self.config
    }

    /// Configured daily operation quota (informational only)
    pub fn opt_count_quota_per_day(&self) -> i32 {
        self.config.opt_count_quota_per_day
    }

    fn bucket(&self) -> &str {
        &self.config.bucket_name
    }

    /// Get or build the shared client / 获取或创建客户端
    async fn client(&self) -> Result<Arc<dyn ObjectClient>> {
        let mut guard = self.client.lock().await;
        if let Some(ref client) = *guard {
            return Ok(client.clone());
        }

        let client: Arc<dyn ObjectClient> = Arc::new(S3ObjectClient::new(
            &self.config.endpoint,
            &self.config.access_key_id,
            &self.config.access_key_secret,
        )?);
        tracing::debug!("OSS client created for endpoint {}", self.config.endpoint);

        *guard = Some(client.clone());
        Ok(client)
    }

    fn apply_cache_control(&self, oss: &mut OssMetadata) {
        if let Some(cache_control) = self.config.cache_control() {
            oss.cache_control = Some(cache_control.to_string());
        }
    }

    /// Native metadata for a new object. The content type falls back to the
    /// extension lookup when the caller left it empty.
    fn build_oss_metadata(&self, object_name: &str, metadata: Option<&ObjectMetadata>) -> OssMetadata {
        let mut metadata = metadata.cloned().unwrap_or_default();
        if metadata.content_type.is_empty() {
            metadata.content_type = self.mime.lookup(&get_ext(object_name));
        }

        let mut oss = OssMetadata::default();
        map_object_to_oss(&metadata, &mut oss);
        self.apply_cache_control(&mut oss);
        oss
    }
}

#[async_trait]
impl StreamStorageProvider for AliyunOssProvider {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn configure(&mut self, config: &HashMap<String, String>) {
        self.config = OssConfig::from_map(config);
        // Rebuild the client from the new settings on next use
        self.client = Arc::new(Mutex::new(None));
    }

    async fn get_object(&self, object_name: &str) -> StorageResult<ObjectWrapper> {
        let name = normalize_object_name(object_name)?;
        let message = format!("Failed to get object: {}", name);
        tracing::debug!("OSS get_object: bucket={}, name={}", self.bucket(), name);

        let client = self.client().await.or_io(&message)?;
        if !client.object_exists(self.bucket(), name).await.or_io(&message)? {
            return Err(StorageError::not_found(name));
        }

        let (content, oss) = client.get_object(self.bucket(), name).await.or_io(&message)?;
        let mut metadata = ObjectMetadata::new();
        map_oss_to_object(&oss, &mut metadata);
        Ok(ObjectWrapper::new(name.to_string(), content, metadata))
    }

    async fn get_object_metadata(&self, object_name: &str) -> StorageResult<ObjectMetadata> {
        let name = normalize_object_name(object_name)?;
        let message = format!("Failed to get object metadata: {}", name);
        tracing::debug!("OSS get_object_metadata: bucket={}, name={}", self.bucket(), name);

        let client = self.client().await.or_io(&message)?;
        if !client.object_exists(self.bucket(), name).await.or_io(&message)? {
            return Err(StorageError::not_found(name));
        }

        let oss = client.get_object_metadata(self.bucket(), name).await.or_io(&message)?;
        let mut metadata = ObjectMetadata::new();
        map_oss_to_object(&oss, &mut metadata);
        Ok(metadata)
    }

    async fn set_object_metadata(
        &self,
        object_name: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let name = normalize_object_name(object_name)?;
        let message = format!("Failed to set object metadata: {}", name);
        tracing::debug!("OSS set_object_metadata: bucket={}, name={}", self.bucket(), name);

        let client = self.client().await.or_io(&message)?;
        if !client.object_exists(self.bucket(), name).await.or_io(&message)? {
            return Ok(());
        }

        // OSS replaces metadata wholesale, so merge onto what is stored
        let mut oss = client.get_object_metadata(self.bucket(), name).await.or_io(&message)?;
        map_object_to_oss(metadata, &mut oss);
        self.apply_cache_control(&mut oss);
        client
            .modify_object_metadata(self.bucket(), name, &oss)
            .await
            .or_io(&message)
    }

    async fn put_object(
        &self,
        object_name: &str,
        content: Bytes,
        override_if_exists: bool,
        metadata: Option<&ObjectMetadata>,
    ) -> StorageResult<()> {
        let name = normalize_object_name(object_name)?;
        if content.is_empty() {
            return Err(StorageError::invalid_argument("content"));
        }
        let message = format!("Failed to put object: {}", name);
        tracing::debug!(
            "OSS put_object: bucket={}, name={}, size={}, override={}",
            self.bucket(),
            name,
            content.len(),
            override_if_exists
        );

        let client = self.client().await.or_io(&message)?;
        if !client.bucket_exists(self.bucket()).await.or_io(&message)? {
            client.create_bucket(self.bucket()).await.or_io(&message)?;
        }

        let exists = client.object_exists(self.bucket(), name).await.or_io(&message)?;
        if exists && !override_if_exists {
            tracing::debug!("OSS put_object skipped, object exists: {}", name);
            return Ok(());
        }

        let oss = self.build_oss_metadata(name, metadata);
        client
            .put_object(self.bucket(), name, content, &oss)
            .await
            .or_io(&message)
    }

    async fn delete_object(&self, object_name: &str) -> StorageResult<()> {
        let name = normalize_object_name(object_name)?;
        let message = format!("Failed to delete object: {}", name);
        tracing::debug!("OSS delete_object: bucket={}, name={}", self.bucket(), name);

        let client = self.client().await.or_io(&message)?;
        if client.object_exists(self.bucket(), name).await.or_io(&message)? {
            client.delete_object(self.bucket(), name).await.or_io(&message)?;
        }
        Ok(())
    }

    async fn object_exists(&self, object_name: &str) -> StorageResult<bool> {
        let name = normalize_object_name(object_name)?;
        let message = format!("Failed to check object existence: {}", name);
        tracing::debug!("OSS object_exists: bucket={}, name={}", self.bucket(), name);

        let client = self.client().await.or_io(&message)?;
        client.object_exists(self.bucket(), name).await.or_io(&message)
    }
}
