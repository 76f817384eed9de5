use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use anyhow::{anyhow, Result};

use super::{StreamStorageProvider, ProviderInfo, ConfigItem};

pub type ProviderBox = Arc<Box<dyn StreamStorageProvider>>;

/// Provider factory trait / 提供者工厂 trait
pub trait ProviderFactory: Send + Sync {
    /// Provider type name / 提供者类型名称
    fn provider_type(&self) -> &'static str;

    /// Create a configured provider instance / 创建提供者实例
    fn create_provider(&self, config: &HashMap<String, String>) -> Result<Box<dyn StreamStorageProvider>>;

    /// Provider specific config items / 提供者特有配置项
    fn additional_items(&self) -> Vec<ConfigItem>;

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider_type: self.provider_type().to_string(),
            items: self.additional_items(),
        }
    }
}

/// Storage manager (manages all provider instances) / 存储管理器
#[derive(Clone, Default)]
pub struct StorageManager {
    providers: Arc<RwLock<HashMap<String, ProviderBox>>>,
    factories: Arc<RwLock<HashMap<String, Arc<Box<dyn ProviderFactory>>>>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register provider factory / 注册提供者工厂
    pub async fn register_factory(&self, factory: Box<dyn ProviderFactory>) -> Result<()> {
        let provider_type = factory.provider_type().to_string();
        let mut factories = self.factories.write().await;
        factories.insert(provider_type.clone(), Arc::new(factory));

        tracing::info!("Provider factory registered: {}", provider_type);
        Ok(())
    }

    /// Create provider instance under `id` / 创建提供者实例
    pub async fn create_provider(
        &self,
        id: String,
        provider_type: &str,
        config: &HashMap<String, String>,
    ) -> Result<String> {
        let factory = {
            let factories = self.factories.read().await;
            factories.get(provider_type)
                .cloned()
                .ok_or_else(|| anyhow!("Provider type not found: {}", provider_type))?
        };

        let provider = factory.create_provider(config)
            .map_err(|e| anyhow!("Provider creation failed: {} ({}) - {}", id, provider_type, e))?;

        let mut providers = self.providers.write().await;
        providers.insert(id.clone(), Arc::new(provider));

        tracing::info!("Provider created: {} ({})", id, provider_type);
        Ok(id)
    }

    /// Get provider instance / 获取提供者实例
    pub async fn get_provider(&self, id: &str) -> Option<ProviderBox> {
        let providers = self.providers.read().await;
        let provider = providers.get(id).cloned();
        if provider.is_none() {
            tracing::warn!("Provider not found: {}", id);
        }
        provider
    }

    /// Remove provider instance / 移除提供者实例
    pub async fn remove_provider(&self, id: &str) -> Result<()> {
        let mut providers = self.providers.write().await;
        providers.remove(id)
            .ok_or_else(|| anyhow!("Provider not found: {}", id))?;

        tracing::info!("Provider removed: {}", id);
        Ok(())
    }

    /// List all provider ids / 列出所有提供者
    pub async fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().await;
        let mut ids: Vec<String> = providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// List all registered provider types / 列出所有提供者类型
    pub async fn list_provider_types(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        let mut types: Vec<String> = factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Describe every registered factory / 获取所有提供者信息
    pub async fn provider_infos(&self) -> Vec<ProviderInfo> {
        let factories = self.factories.read().await;
        let mut infos: Vec<ProviderInfo> = factories.values().map(|f| f.provider_info()).collect();
        infos.sort_by(|a, b| a.provider_type.cmp(&b.provider_type));
        infos
    }
}
