pub mod storage;
pub mod utils;

// Provider modules (point to project root drivers via path attribute) / 提供者模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use storage::{
    ObjectMetadata, ObjectWrapper, StorageError, StorageManager, StorageResult,
    StreamStorageProvider,
};

// Register all storage providers / 注册所有存储提供者
pub async fn register_storage_providers(manager: &storage::StorageManager) -> anyhow::Result<()> {
    drivers::register_all(manager).await
}
