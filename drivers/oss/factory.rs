//! OSS provider factory / OSS提供者工厂

use std::collections::HashMap;

use anyhow::Result;

use crate::storage::{ConfigItem, ProviderFactory, StreamStorageProvider};
use super::config::DEFAULT_OPT_COUNT_QUOTA_PER_DAY;
use super::provider::{AliyunOssProvider, PROVIDER_NAME};

/// OSS provider factory
pub struct OssProviderFactory;

impl ProviderFactory for OssProviderFactory {
    fn provider_type(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn additional_items(&self) -> Vec<ConfigItem> {
        vec![
            ConfigItem::new("endpoint", "string")
                .help("OSS endpoint, e.g. https://oss-cn-hangzhou.aliyuncs.com")
                .required(),
            ConfigItem::new("accessKeyId", "string")
                .required(),
            ConfigItem::new("accessKeySecret", "password")
                .required(),
            ConfigItem::new("bucketName", "string")
                .help("Bucket name, created on first write when missing")
                .required(),
            ConfigItem::new("optCountQuotaPerDay", "number")
                .help("Operation count quota per day")
                .default(&DEFAULT_OPT_COUNT_QUOTA_PER_DAY.to_string()),
            ConfigItem::new("objectMetadata_CacheControl", "string")
                .help("Cache-Control applied to every written object"),
        ]
    }

    fn create_provider(&self, config: &HashMap<String, String>) -> Result<Box<dyn StreamStorageProvider>> {
        let mut provider = AliyunOssProvider::new();
        provider.configure(config);
        Ok(Box::new(provider))
    }
}
