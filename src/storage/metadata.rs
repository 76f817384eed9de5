//! Shared metadata merge helpers / 元数据合并
//!
//! Metadata is always merged, never replaced: entries present only in the
//! target survive a merge.

use std::collections::HashMap;

use super::ObjectMetadata;

/// Upsert every source entry into the target / 逐项更新或插入
pub fn merge_user_metadata(source: &HashMap<String, String>, target: &mut HashMap<String, String>) {
    for (key, value) in source {
        match target.get_mut(key) {
            Some(existing) => *existing = value.clone(),
            None => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Merge normalized metadata onto normalized metadata (used by backends
/// whose native form is `ObjectMetadata` itself). Same field rules as the
/// OSS mapping: disposition copied verbatim, empty type and unset length
/// ignored, user entries upserted.
pub fn merge_object_metadata(source: &ObjectMetadata, target: &mut ObjectMetadata) {
    target.content_disposition = source.content_disposition.clone();
    if source.content_length.is_some() {
        target.content_length = source.content_length;
    }
    if !source.content_type.is_empty() {
        target.content_type = source.content_type.clone();
    }
    merge_user_metadata(&source.user_metadata, &mut target.user_metadata);
}
