use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::io::AsyncRead;

pub mod error;
pub mod manager;
pub mod metadata;
pub mod mime;

pub use error::{IoResultExt, StorageError, StorageResult};
pub use manager::{ProviderBox, ProviderFactory, StorageManager};
pub use metadata::merge_user_metadata;
pub use mime::{MimeGuessLookup, MimeLookup};

/// Caller-owned object content reader / 对象内容读取器
pub type ObjectReader = Box<dyn AsyncRead + Unpin + Send>;

/// Normalized object metadata / 规范化对象元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// MIME type, empty means unset / MIME类型
    #[serde(default)]
    pub content_type: String,
    /// Content length in bytes / 内容长度
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    /// User defined key/value pairs / 用户自定义元数据
    #[serde(default)]
    pub user_metadata: HashMap<String, String>,
}

impl ObjectMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_content_disposition(mut self, disposition: &str) -> Self {
        self.content_disposition = Some(disposition.to_string());
        self
    }

    pub fn with_user_metadata(mut self, key: &str, value: &str) -> Self {
        self.user_metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Object returned by `get_object` / 获取对象的结果
pub struct ObjectWrapper {
    pub object_name: String,
    pub content: ObjectReader,
    pub metadata: ObjectMetadata,
}

impl ObjectWrapper {
    pub fn new(object_name: String, content: ObjectReader, metadata: ObjectMetadata) -> Self {
        Self {
            object_name,
            content,
            metadata,
        }
    }

    /// Read the whole content into memory / 读取全部内容
    pub async fn read_to_bytes(mut self) -> std::io::Result<Bytes> {
        use tokio::io::AsyncReadExt;
        let mut buf = Vec::new();
        self.content.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

impl fmt::Debug for ObjectWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectWrapper")
            .field("object_name", &self.object_name)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Configuration item definition / 配置项定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ConfigItem {
    pub fn new(name: &str, item_type: &str) -> Self {
        Self {
            name: name.to_string(),
            item_type: item_type.to_string(),
            default: None,
            required: false,
            help: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, val: &str) -> Self {
        self.default = Some(val.to_string());
        self
    }

    pub fn help(mut self, val: &str) -> Self {
        self.help = Some(val.to_string());
        self
    }
}

/// Provider description for host applications / 提供者信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub provider_type: String,
    pub items: Vec<ConfigItem>,
}

/// Trim path separators from an object name, rejecting empty names / 规范化对象名
pub fn normalize_object_name(object_name: &str) -> StorageResult<&str> {
    let name = object_name.trim_matches('/');
    if name.is_empty() {
        return Err(StorageError::invalid_argument("objectName"));
    }
    Ok(name)
}

/// Object storage provider contract / 对象存储提供者接口
///
/// Every operation normalizes the object name first and fails with
/// `InvalidArgument` before touching the backend when it is empty.
#[async_trait]
pub trait StreamStorageProvider: Send + Sync {
    /// Provider name / 提供者名称
    fn provider_name(&self) -> &str;

    /// Apply configuration. Unknown keys are ignored and this never fails.
    fn configure(&mut self, config: &HashMap<String, String>);

    /// Fetch content and metadata / 获取对象
    async fn get_object(&self, object_name: &str) -> StorageResult<ObjectWrapper>;

    /// Fetch metadata only, no content transfer / 获取对象元数据
    async fn get_object_metadata(&self, object_name: &str) -> StorageResult<ObjectMetadata>;

    /// Merge metadata onto an existing object; no-op when the object is absent
    async fn set_object_metadata(
        &self,
        object_name: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()>;

    /// Write an object. When it already exists and `override_if_exists` is
    /// false nothing is written.
    async fn put_object(
        &self,
        object_name: &str,
        content: Bytes,
        override_if_exists: bool,
        metadata: Option<&ObjectMetadata>,
    ) -> StorageResult<()>;

    /// Delete an object; no-op when absent / 删除对象
    async fn delete_object(&self, object_name: &str) -> StorageResult<()>;

    /// Check existence / 判断对象是否存在
    async fn object_exists(&self, object_name: &str) -> StorageResult<bool>;
}
