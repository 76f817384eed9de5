pub mod config;
pub mod driver;

use anyhow::Result;
use std::collections::HashMap;

use crate::storage::{ConfigItem, ProviderFactory, StreamStorageProvider};

pub use config::LocalConfig;
pub use driver::LocalStorageProvider;

/// Local disk provider factory / 本地存储工厂
pub struct LocalProviderFactory;

impl ProviderFactory for LocalProviderFactory {
    fn provider_type(&self) -> &'static str {
        driver::PROVIDER_NAME
    }

    fn additional_items(&self) -> Vec<ConfigItem> {
        vec![
            ConfigItem::new("root", "string")
                .required()
                .help("Directory holding stored objects"),
        ]
    }

    fn create_provider(&self, config: &HashMap<String, String>) -> Result<Box<dyn StreamStorageProvider>> {
        let root = LocalConfig::from_map(config)
            .root_path()
            .ok_or_else(|| anyhow::anyhow!("Missing root config"))?;

        std::fs::create_dir_all(&root)
            .map_err(|e| anyhow::anyhow!("Failed to create root {:?}: {}", root, e))?;
        tracing::info!("Local provider initialized, root: {:?}", root);

        let mut provider = LocalStorageProvider::default();
        provider.configure(config);
        Ok(Box::new(provider))
    }
}
