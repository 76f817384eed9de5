// Provider package / 存储提供者
pub mod local;
pub mod oss;

use crate::storage::StorageManager;

/// Register all providers to StorageManager / 注册所有提供者
pub async fn register_all(manager: &StorageManager) -> anyhow::Result<()> {
    // Register Aliyun OSS provider / 注册阿里云OSS
    manager.register_factory(Box::new(oss::OssProviderFactory)).await?;
    // Register local disk provider / 注册本地存储
    manager.register_factory(Box::new(local::LocalProviderFactory)).await?;
    Ok(())
}
