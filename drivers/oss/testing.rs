//! In-memory doubles for OSS provider tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::{MimeLookup, ObjectReader};
use super::client::{ObjectClient, OssMetadata};

#[derive(Default)]
struct MemoryState {
    buckets: HashSet<String>,
    objects: HashMap<(String, String), (Bytes, OssMetadata)>,
    calls: Vec<String>,
    fail: bool,
}

/// Object client keeping everything in memory, recording each call
#[derive(Default)]
pub struct MemoryObjectClient {
    state: Mutex<MemoryState>,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(bucket: &str) -> Self {
        let client = Self::new();
        client.state.lock().unwrap().buckets.insert(bucket.to_string());
        client
    }

    /// Make every following call fail
    pub fn fail_all(&self) {
        self.state.lock().unwrap().fail = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.state.lock().unwrap().buckets.contains(bucket)
    }

    pub fn stored(&self, bucket: &str, key: &str) -> Option<(Bytes, OssMetadata)> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn insert(&self, bucket: &str, key: &str, content: &'static [u8], mut metadata: OssMetadata) {
        metadata.content_length = content.len() as i64;
        let mut state = self.state.lock().unwrap();
        state.buckets.insert(bucket.to_string());
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), (Bytes::from_static(content), metadata));
    }

    fn record(&self, call: String) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.fail {
            return Err(anyhow!("injected backend failure"));
        }
        Ok(state)
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let state = self.record(format!("object_exists {}/{}", bucket, key))?;
        Ok(state.objects.contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let state = self.record(format!("bucket_exists {}", bucket))?;
        Ok(state.buckets.contains(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.record(format!("create_bucket {}", bucket))?;
        state.buckets.insert(bucket.to_string());
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<(ObjectReader, OssMetadata)> {
        let state = self.record(format!("get_object {}/{}", bucket, key))?;
        let (content, metadata) = state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("NoSuchKey"))?;
        let reader: ObjectReader = Box::new(std::io::Cursor::new(content.to_vec()));
        Ok((reader, metadata))
    }

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> Result<OssMetadata> {
        let state = self.record(format!("get_object_metadata {}/{}", bucket, key))?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(_, metadata)| metadata.clone())
            .ok_or_else(|| anyhow!("NoSuchKey"))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        metadata: &OssMetadata,
    ) -> Result<()> {
        let mut state = self.record(format!("put_object {}/{}", bucket, key))?;
        if !state.buckets.contains(bucket) {
            return Err(anyhow!("NoSuchBucket"));
        }
        let mut metadata = metadata.clone();
        metadata.content_length = content.len() as i64;
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), (content, metadata));
        Ok(())
    }

    async fn modify_object_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: &OssMetadata,
    ) -> Result<()> {
        let mut state = self.record(format!("modify_object_metadata {}/{}", bucket, key))?;
        let entry = state
            .objects
            .get_mut(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| anyhow!("NoSuchKey"))?;
        let length = entry.1.content_length;
        entry.1 = metadata.clone();
        entry.1.content_length = length;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut state = self.record(format!("delete_object {}/{}", bucket, key))?;
        state.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

/// Client that fails the test when touched
pub struct PanicObjectClient;

#[async_trait]
impl ObjectClient for PanicObjectClient {
    async fn object_exists(&self, _: &str, _: &str) -> Result<bool> {
        panic!("object_exists must not be called")
    }

    async fn bucket_exists(&self, _: &str) -> Result<bool> {
        panic!("bucket_exists must not be called")
    }

    async fn create_bucket(&self, _: &str) -> Result<()> {
        panic!("create_bucket must not be called")
    }

    async fn get_object(&self, _: &str, _: &str) -> Result<(ObjectReader, OssMetadata)> {
        panic!("get_object must not be called")
    }

    async fn get_object_metadata(&self, _: &str, _: &str) -> Result<OssMetadata> {
        panic!("get_object_metadata must not be called")
    }

    async fn put_object(&self, _: &str, _: &str, _: Bytes, _: &OssMetadata) -> Result<()> {
        panic!("put_object must not be called")
    }

    async fn modify_object_metadata(&self, _: &str, _: &str, _: &OssMetadata) -> Result<()> {
        panic!("modify_object_metadata must not be called")
    }

    async fn delete_object(&self, _: &str, _: &str) -> Result<()> {
        panic!("delete_object must not be called")
    }
}

/// MIME lookup counting its calls
#[derive(Default)]
pub struct CountingMimeLookup {
    calls: AtomicUsize,
    extensions: Mutex<Vec<String>>,
}

impl CountingMimeLookup {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn extensions(&self) -> Vec<String> {
        self.extensions.lock().unwrap().clone()
    }
}

impl MimeLookup for CountingMimeLookup {
    fn lookup(&self, extension: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.extensions.lock().unwrap().push(extension.to_string());
        "application/x-test".to_string()
    }
}
