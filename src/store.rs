use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use tracing::debug;

use crate::config::SyncConfig;

/// The object-store operations a rename needs.
#[async_trait]
pub trait VideoStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// `Ok(false)` means the store answered and the object is not there;
    /// an `Err` means the probe itself failed.
    async fn object_exists(&self, key: &str) -> Result<bool>;

    /// Bucket-internal copy preserving content.
    async fn copy_object(&self, source_key: &str, target_key: &str) -> Result<()>;

    async fn delete_object(&self, key: &str) -> Result<()>;
}

pub struct S3VideoStore {
    client: Client,
    bucket: String,
}

impl S3VideoStore {
    pub fn new<S: Into<String>>(client: Client, bucket: S) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client from the standard AWS credential chain, pinned to the
    /// configured region. A custom endpoint switches to path-style addressing
    /// so S3-compatible stores work too.
    pub async fn connect(config: &SyncConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(url) = &config.endpoint_url {
            builder = builder.endpoint_url(url).force_path_style(true);
        }

        Self::new(Client::from_conf(builder.build()), config.bucket_name.clone())
    }
}

#[async_trait]
impl VideoStore for S3VideoStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        let result = self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(err).with_context(|| format!("HeadObject failed for {}", key)),
        }
    }

    async fn copy_object(&self, source_key: &str, target_key: &str) -> Result<()> {
        let copy_source = encode_copy_source(&self.bucket, source_key);
        debug!(%copy_source, target_key, "copying object");

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(copy_source)
            .key(target_key)
            .send()
            .await
            .with_context(|| format!("CopyObject failed for {} -> {}", source_key, target_key))?;

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("DeleteObject failed for {}", key))?;

        Ok(())
    }
}

// S3 expects the copy source as "<bucket>/<key>" with each key segment URL-encoded
pub fn encode_copy_source(bucket: &str, key: &str) -> String {
    let encoded_key = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    format!("{}/{}", bucket, encoded_key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Exists(String),
    Copy { source: String, target: String },
    Delete(String),
}

/// Ways to make `MemoryVideoStore` misbehave for a given key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFault {
    ProbeError(String),
    CopyError { target: String },
    /// Copy reports success but nothing lands at the target key.
    LostCopy { target: String },
    DeleteError(String),
}

/// In-process `VideoStore` keeping objects in a map. Records every call so
/// callers can assert which operations a sync performed.
pub struct MemoryVideoStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    calls: Mutex<Vec<StoreCall>>,
    faults: Mutex<Vec<StoreFault>>,
}

impl MemoryVideoStore {
    pub fn new<S: Into<String>>(bucket: S) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
        }
    }

    pub fn with_object<K: Into<String>>(self, key: K, content: &[u8]) -> Self {
        self.put_object(key, content);
        self
    }

    pub fn put_object<K: Into<String>>(&self, key: K, content: &[u8]) {
        lock(&self.objects).insert(key.into(), content.to_vec());
    }

    pub fn inject_fault(&self, fault: StoreFault) {
        lock(&self.faults).push(fault);
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.objects).contains_key(key)
    }

    pub fn content(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects).get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Calls that change the bucket (copy and delete).
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, StoreCall::Exists(_)))
            .collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: StoreCall) {
        lock(&self.calls).push(call);
    }

    fn has_fault(&self, fault: &StoreFault) -> bool {
        lock(&self.faults).contains(fault)
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn object_exists(&self, key: &str) -> Result<bool> {
        self.record(StoreCall::Exists(key.to_string()));

        if self.has_fault(&StoreFault::ProbeError(key.to_string())) {
            return Err(anyhow!("probe failed for {}", key));
        }

        Ok(self.contains(key))
    }

    async fn copy_object(&self, source_key: &str, target_key: &str) -> Result<()> {
        self.record(StoreCall::Copy {
            source: source_key.to_string(),
            target: target_key.to_string(),
        });

        let target = target_key.to_string();
        if self.has_fault(&StoreFault::CopyError { target: target.clone() }) {
            return Err(anyhow!("copy failed for {} -> {}", source_key, target_key));
        }

        let content = self.content(source_key)
            .ok_or_else(|| anyhow!("NoSuchKey: {}", source_key))?;

        if !self.has_fault(&StoreFault::LostCopy { target: target.clone() }) {
            lock(&self.objects).insert(target, content);
        }

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.record(StoreCall::Delete(key.to_string()));

        if self.has_fault(&StoreFault::DeleteError(key.to_string())) {
            return Err(anyhow!("delete failed for {}", key));
        }

        // S3 deletes are idempotent; a missing key is not an error
        lock(&self.objects).remove(key);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::copy_object::CopyObjectOutput;
    use aws_sdk_s3::operation::head_object::{HeadObjectError, HeadObjectOutput};
    use aws_sdk_s3::types::error::NotFound;
    use aws_smithy_mocks::{mock, mock_client};

    fn s3_store_answering_head(rule: &aws_smithy_mocks::Rule) -> S3VideoStore {
        let client = mock_client!(aws_sdk_s3, [rule]);
        S3VideoStore::new(client, "gloss-bucket")
    }

    #[tokio::test]
    async fn test_s3_head_found() {
        let rule = mock!(aws_sdk_s3::Client::head_object)
            .match_requests(|req| {
                req.bucket() == Some("gloss-bucket") && req.key() == Some("inputs/Data_Videos/HELLO.mp4")
            })
            .then_output(|| HeadObjectOutput::builder().build());
        let store = s3_store_answering_head(&rule);

        assert!(store.object_exists("inputs/Data_Videos/HELLO.mp4").await.unwrap());
        assert_eq!(rule.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_s3_head_not_found_is_absent() {
        let rule = mock!(aws_sdk_s3::Client::head_object)
            .then_error(|| HeadObjectError::NotFound(NotFound::builder().build()));
        let store = s3_store_answering_head(&rule);

        assert!(!store.object_exists("inputs/Data_Videos/gone.mp4").await.unwrap());
    }

    #[tokio::test]
    async fn test_s3_head_other_error_is_err() {
        let rule = mock!(aws_sdk_s3::Client::head_object).then_error(|| {
            HeadObjectError::generic(ErrorMetadata::builder().code("AccessDenied").build())
        });
        let store = s3_store_answering_head(&rule);

        let err = store.object_exists("inputs/Data_Videos/HELLO.mp4").await.unwrap_err();
        assert!(format!("{:#}", err).contains("HeadObject failed for inputs/Data_Videos/HELLO.mp4"));
    }

    #[tokio::test]
    async fn test_s3_copy_sends_encoded_source() {
        let rule = mock!(aws_sdk_s3::Client::copy_object)
            .match_requests(|req| {
                req.copy_source() == Some("gloss-bucket/inputs/Data_Videos/thanks%20v2.mp4")
                    && req.key() == Some("inputs/Data_Videos/THANK YOU.mp4")
            })
            .then_output(|| CopyObjectOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, [&rule]);
        let store = S3VideoStore::new(client, "gloss-bucket");

        store
            .copy_object("inputs/Data_Videos/thanks v2.mp4", "inputs/Data_Videos/THANK YOU.mp4")
            .await
            .unwrap();
        assert_eq!(rule.num_calls(), 1);
    }

    #[test]
    fn test_encode_copy_source() {
        assert_eq!(
            encode_copy_source("gloss-bucket", "inputs/Data_Videos/HELLO.mp4"),
            "gloss-bucket/inputs/Data_Videos/HELLO.mp4"
        );
        assert_eq!(
            encode_copy_source("gloss-bucket", "inputs/Data_Videos/THANK YOU+1.mp4"),
            "gloss-bucket/inputs/Data_Videos/THANK%20YOU%2B1.mp4"
        );
    }

    #[tokio::test]
    async fn test_memory_store_copy_and_delete() {
        let store = MemoryVideoStore::new("bucket").with_object("a.mp4", b"video");
        assert_eq!(store.bucket(), "bucket");

        store.copy_object("a.mp4", "b.mp4").await.unwrap();
        assert_eq!(store.content("b.mp4"), Some(b"video".to_vec()));

        store.delete_object("a.mp4").await.unwrap();
        assert!(!store.object_exists("a.mp4").await.unwrap());
        assert!(store.object_exists("b.mp4").await.unwrap());
        assert_eq!(store.keys(), vec!["b.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_store_copy_missing_source() {
        let store = MemoryVideoStore::new("bucket");
        assert!(store.copy_object("missing.mp4", "b.mp4").await.is_err());
        assert!(!store.contains("b.mp4"));
    }

    #[tokio::test]
    async fn test_memory_store_faults() {
        let store = MemoryVideoStore::new("bucket").with_object("a.mp4", b"video");
        store.inject_fault(StoreFault::ProbeError("a.mp4".to_string()));
        store.inject_fault(StoreFault::LostCopy { target: "b.mp4".to_string() });

        assert!(store.object_exists("a.mp4").await.is_err());
        store.copy_object("a.mp4", "b.mp4").await.unwrap();
        assert!(!store.contains("b.mp4"));
        assert_eq!(store.mutations().len(), 1);
    }
}
