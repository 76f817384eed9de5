//! OSS provider configuration / OSS配置

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Daily operation quota used when the configured value is absent or malformed
pub const DEFAULT_OPT_COUNT_QUOTA_PER_DAY: i32 = 10000;

/// OSS configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OssConfig {
    /// OSS endpoint, e.g. https://oss-cn-hangzhou.aliyuncs.com
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub access_key_secret: String,
    #[serde(default)]
    pub bucket_name: String,
    /// Stored for host applications, not enforced here
    #[serde(default = "default_quota")]
    pub opt_count_quota_per_day: i32,
    /// Cache-Control applied to every write when non-empty
    #[serde(default, rename = "objectMetadata_CacheControl")]
    pub object_metadata_cache_control: String,
}

fn default_quota() -> i32 {
    DEFAULT_OPT_COUNT_QUOTA_PER_DAY
}

impl Default for OssConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key_id: String::new(),
            access_key_secret: String::new(),
            bucket_name: String::new(),
            opt_count_quota_per_day: default_quota(),
            object_metadata_cache_control: String::new(),
        }
    }
}

impl OssConfig {
    /// Build from a flat config map. Never fails: missing keys become empty,
    /// a malformed quota falls back to the default.
    pub fn from_map(config: &HashMap<String, String>) -> Self {
        let get = |key: &str| config.get(key).cloned().unwrap_or_default();

        let opt_count_quota_per_day = config
            .get("optCountQuotaPerDay")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(DEFAULT_OPT_COUNT_QUOTA_PER_DAY);

        Self {
            endpoint: get("endpoint"),
            access_key_id: get("accessKeyId"),
            access_key_secret: get("accessKeySecret"),
            bucket_name: get("bucketName"),
            opt_count_quota_per_day,
            object_metadata_cache_control: get("objectMetadata_CacheControl"),
        }
    }

    pub fn cache_control(&self) -> Option<&str> {
        if self.object_metadata_cache_control.is_empty() {
            None
        } else {
            Some(&self.object_metadata_cache_control)
        }
    }
}

impl fmt::Debug for OssConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OssConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"***")
            .field("bucket_name", &self.bucket_name)
            .field("opt_count_quota_per_day", &self.opt_count_quota_per_day)
            .field("object_metadata_cache_control", &self.object_metadata_cache_control)
            .finish()
    }
}
