//! Mapping between normalized and OSS metadata / 元数据映射
//!
//! Both directions merge onto the target instead of replacing it.

use crate::storage::{merge_user_metadata, ObjectMetadata};
use super::client::OssMetadata;

/// OSS -> normalized
pub fn map_oss_to_object(oss: &OssMetadata, target: &mut ObjectMetadata) {
    target.content_disposition = oss.content_disposition.clone();
    if oss.content_length >= 0 {
        target.content_length = Some(oss.content_length as u64);
    }
    if !oss.content_type.is_empty() {
        target.content_type = oss.content_type.clone();
    }
    merge_user_metadata(&oss.user_metadata, &mut target.user_metadata);
}

/// normalized -> OSS. Content length is left to the request body.
pub fn map_object_to_oss(metadata: &ObjectMetadata, target: &mut OssMetadata) {
    target.content_disposition = metadata.content_disposition.clone();
    if !metadata.content_type.is_empty() {
        target.content_type = metadata.content_type.clone();
    }
    merge_user_metadata(&metadata.user_metadata, &mut target.user_metadata);
}
