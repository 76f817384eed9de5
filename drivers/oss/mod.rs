//! Aliyun OSS storage provider
//!
//! `AliyunOssProvider` implements the provider contract on top of an
//! `ObjectClient`; `S3ObjectClient` (rust-s3 over the S3-compatible API)
//! is the implementation used in production.

pub mod client;
pub mod config;
pub mod factory;
pub mod metadata;
pub mod provider;
pub mod s3_client;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ObjectClient, OssMetadata};
pub use config::OssConfig;
pub use factory::OssProviderFactory;
pub use provider::AliyunOssProvider;
pub use s3_client::S3ObjectClient;
