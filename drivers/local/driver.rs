use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::storage::metadata::merge_object_metadata;
use crate::storage::{
    normalize_object_name, IoResultExt, MimeGuessLookup, MimeLookup, ObjectMetadata, ObjectReader,
    ObjectWrapper, StorageError, StorageResult, StreamStorageProvider,
};
use crate::utils::get_ext;
use super::config::LocalConfig;

pub const PROVIDER_NAME: &str = "local";

/// Sidecar metadata directory under the root / 元数据目录
const META_DIR: &str = ".meta";

/// Resolved on-disk locations of one object
struct ObjectPaths {
    name: String,
    data: PathBuf,
    meta: PathBuf,
}

/// Local disk provider / 本地磁盘存储提供者
///
/// Objects live at `{root}/{name}`, their metadata as JSON at
/// `{root}/.meta/{name}.json`.
pub struct LocalStorageProvider {
    config: LocalConfig,
    root: PathBuf,
    mime: Arc<dyn MimeLookup>,
}

impl Default for LocalStorageProvider {
    fn default() -> Self {
        Self {
            config: LocalConfig::default(),
            root: PathBuf::new(),
            mime: Arc::new(MimeGuessLookup),
        }
    }
}

impl LocalStorageProvider {
    pub fn new(root: PathBuf) -> Self {
        Self {
            config: LocalConfig {
                root: root.to_string_lossy().to_string(),
            },
            root,
            mime: Arc::new(MimeGuessLookup),
        }
    }

    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    /// Get root directory / 获取根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalize the name and reject traversal or metadata paths / 规范化路径
    fn resolve(&self, object_name: &str) -> StorageResult<ObjectPaths> {
        let name = normalize_object_name(object_name)?;
        let parts: Vec<&str> = name.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
        if parts.is_empty() || parts.contains(&"..") || parts[0] == META_DIR {
            return Err(StorageError::invalid_argument("objectName"));
        }
        if self.root.as_os_str().is_empty() {
            return Err(StorageError::io(
                "Local provider is not configured",
                io::Error::new(io::ErrorKind::NotFound, "missing root"),
            ));
        }

        let name = parts.join("/");
        Ok(ObjectPaths {
            data: self.root.join(&name),
            meta: self.root.join(META_DIR).join(format!("{}.json", name)),
            name,
        })
    }

    async fn exists(paths: &ObjectPaths) -> io::Result<bool> {
        match tokio::fs::metadata(&paths.data).await {
            Ok(m) => Ok(m.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Stored sidecar, empty when none was written
    async fn read_sidecar(paths: &ObjectPaths) -> io::Result<ObjectMetadata> {
        match tokio::fs::read(&paths.meta).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ObjectMetadata::default()),
            Err(e) => Err(e),
        }
    }

    async fn write_sidecar(paths: &ObjectPaths, metadata: &ObjectMetadata) -> io::Result<()> {
        let staged = Self::stage_sidecar(paths, metadata).await?;
        tokio::fs::rename(&staged, &paths.meta).await
    }

    /// Write the sidecar next to its final location, returning the temp path
    async fn stage_sidecar(paths: &ObjectPaths, metadata: &ObjectMetadata) -> io::Result<PathBuf> {
        if let Some(parent) = paths.meta.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut stored = metadata.clone();
        stored.content_length = None;

        let mut staged = paths.meta.clone().into_os_string();
        staged.push(".tmp");
        let staged = PathBuf::from(staged);
        tokio::fs::write(&staged, serde_json::to_vec_pretty(&stored)?).await?;
        Ok(staged)
    }

    async fn write_data(paths: &ObjectPaths, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = paths.data.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&paths.data, content).await
    }

    async fn read_metadata(paths: &ObjectPaths) -> io::Result<ObjectMetadata> {
        let mut metadata = Self::read_sidecar(paths).await?;
        metadata.content_length = Some(tokio::fs::metadata(&paths.data).await?.len());
        Ok(metadata)
    }
}

#[async_trait]
impl StreamStorageProvider for LocalStorageProvider {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn configure(&mut self, config: &HashMap<String, String>) {
        self.config = LocalConfig::from_map(config);
        self.root = self.config.root_path().unwrap_or_default();
    }

    async fn get_object(&self, object_name: &str) -> StorageResult<ObjectWrapper> {
        let paths = self.resolve(object_name)?;
        let message = format!("Failed to get object: {}", paths.name);
        tracing::debug!("Local get_object: {:?}", paths.data);

        if !Self::exists(&paths).await.or_io(&message)? {
            return Err(StorageError::not_found(&paths.name));
        }
        let metadata = Self::read_metadata(&paths).await.or_io(&message)?;
        let file = tokio::fs::File::open(&paths.data).await.or_io(&message)?;
        let content: ObjectReader = Box::new(file);
        Ok(ObjectWrapper::new(paths.name, content, metadata))
    }

    async fn get_object_metadata(&self, object_name: &str) -> StorageResult<ObjectMetadata> {
        let paths = self.resolve(object_name)?;
        let message = format!("Failed to get object metadata: {}", paths.name);
        tracing::debug!("Local get_object_metadata: {:?}", paths.data);

        if !Self::exists(&paths).await.or_io(&message)? {
            return Err(StorageError::not_found(&paths.name));
        }
        Self::read_metadata(&paths).await.or_io(&message)
    }

    async fn set_object_metadata(
        &self,
        object_name: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let paths = self.resolve(object_name)?;
        let message = format!("Failed to set object metadata: {}", paths.name);
        tracing::debug!("Local set_object_metadata: {:?}", paths.meta);

        if !Self::exists(&paths).await.or_io(&message)? {
            return Ok(());
        }
        let mut stored = Self::read_sidecar(&paths).await.or_io(&message)?;
        merge_object_metadata(metadata, &mut stored);
        Self::write_sidecar(&paths, &stored).await.or_io(&message)
    }

    async fn put_object(
        &self,
        object_name: &str,
        content: Bytes,
        override_if_exists: bool,
        metadata: Option<&ObjectMetadata>,
    ) -> StorageResult<()> {
        let paths = self.resolve(object_name)?;
        if content.is_empty() {
            return Err(StorageError::invalid_argument("content"));
        }
        let message = format!("Failed to put object: {}", paths.name);
        tracing::debug!("Local put_object: {:?}, override={}", paths.data, override_if_exists);

        if Self::exists(&paths).await.or_io(&message)? && !override_if_exists {
            tracing::debug!("Local put_object skipped, object exists: {}", paths.name);
            return Ok(());
        }

        let mut metadata = metadata.cloned().unwrap_or_default();
        if metadata.content_type.is_empty() {
            metadata.content_type = self.mime.lookup(&get_ext(&paths.name));
        }

        // Sidecar is staged first so a failed write leaves the old object intact
        let staged = Self::stage_sidecar(&paths, &metadata).await.or_io(&message)?;
        if let Err(e) = Self::write_data(&paths, &content).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(StorageError::io(&message, e));
        }
        tokio::fs::rename(&staged, &paths.meta).await.or_io(&message)
    }

    async fn delete_object(&self, object_name: &str) -> StorageResult<()> {
        let paths = self.resolve(object_name)?;
        let message = format!("Failed to delete object: {}", paths.name);
        tracing::debug!("Local delete_object: {:?}", paths.data);

        if !Self::exists(&paths).await.or_io(&message)? {
            return Ok(());
        }
        tokio::fs::remove_file(&paths.data).await.or_io(&message)?;
        match tokio::fs::remove_file(&paths.meta).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(StorageError::io(&message, e)),
            _ => Ok(()),
        }
    }

    async fn object_exists(&self, object_name: &str) -> StorageResult<bool> {
        let paths = self.resolve(object_name)?;
        tracing::debug!("Local object_exists: {:?}", paths.data);
        Self::exists(&paths)
            .await
            .or_io(&format!("Failed to check object existence: {}", paths.name))
    }
}
