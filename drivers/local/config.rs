//! Local provider configuration / 本地存储配置

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Local disk configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory holding stored objects
    #[serde(default)]
    pub root: String,
}

impl LocalConfig {
    /// Build from a flat config map. Never fails: a missing root stays empty.
    pub fn from_map(config: &HashMap<String, String>) -> Self {
        Self {
            root: config
                .get("root")
                .map(|r| r.trim().to_string())
                .unwrap_or_default(),
        }
    }

    /// Root directory, `None` when unset
    pub fn root_path(&self) -> Option<PathBuf> {
        if self.root.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.root))
        }
    }
}
