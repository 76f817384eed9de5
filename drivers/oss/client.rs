//! OSS backend collaborator contract / OSS客户端接口

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::ObjectReader;

/// Native OSS object metadata / OSS原生元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OssMetadata {
    pub content_type: String,
    /// `-1` when the backend did not report a length
    pub content_length: i64,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    /// User metadata entries without the header prefix
    pub user_metadata: HashMap<String, String>,
}

impl Default for OssMetadata {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            content_length: -1,
            content_disposition: None,
            cache_control: None,
            user_metadata: HashMap::new(),
        }
    }
}

/// Operations the OSS provider needs from a storage client.
///
/// Every method may fail with an opaque fault; the provider classifies it.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<(ObjectReader, OssMetadata)>;

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> Result<OssMetadata>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        metadata: &OssMetadata,
    ) -> Result<()>;

    /// Replace the stored metadata of an existing object
    async fn modify_object_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: &OssMetadata,
    ) -> Result<()>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}
