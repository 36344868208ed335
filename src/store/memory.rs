//! In-memory object store for tests and offline use
//!
//! Objects, storage classes and injected failures are configured up front;
//! every call is counted so tests can assert on request ordering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use super::{ByteRange, GetObject, HeadObject, ObjectStore, SignOptions, Signer, StoreError};
use crate::core::S3Handle;

#[derive(Debug, Clone, Default)]
struct StoredObject {
    body: Bytes,
    storage_class: Option<String>,
    delete_marker: bool,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<(String, String), StoredObject>,
    head_failures: HashMap<(String, String), StoreError>,
    get_failures: HashMap<(String, String), StoreError>,
    calls: Vec<String>,
}

/// In-memory [`ObjectStore`] and [`Signer`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    heads: Arc<AtomicUsize>,
    gets: Arc<AtomicUsize>,
}

fn slot(handle: &S3Handle) -> (String, String) {
    (handle.bucket.clone(), handle.key.clone())
}

fn no_such_key() -> StoreError {
    StoreError::new(404, "NoSuchKey", "The specified key does not exist.")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-call
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add (or replace) an object
    pub fn put(&self, bucket: &str, key: &str, body: impl Into<Bytes>) -> &Self {
        self.lock().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                ..Default::default()
            },
        );
        self
    }

    /// Set the storage class of an existing object
    pub fn set_storage_class(&self, bucket: &str, key: &str, class: &str) -> &Self {
        if let Some(obj) = self
            .lock()
            .objects
            .get_mut(&(bucket.to_string(), key.to_string()))
        {
            obj.storage_class = Some(class.to_string());
        }
        self
    }

    /// Replace an object with a delete marker
    pub fn put_delete_marker(&self, bucket: &str, key: &str) -> &Self {
        self.lock().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                delete_marker: true,
                ..Default::default()
            },
        );
        self
    }

    /// Make every HEAD of this object fail with `error`
    pub fn fail_head(&self, bucket: &str, key: &str, error: StoreError) -> &Self {
        self.lock()
            .head_failures
            .insert((bucket.to_string(), key.to_string()), error);
        self
    }

    /// Make every GET of this object fail with `error`
    pub fn fail_get(&self, bucket: &str, key: &str, error: StoreError) -> &Self {
        self.lock()
            .get_failures
            .insert((bucket.to_string(), key.to_string()), error);
        self
    }

    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Calls made so far, as `"HEAD key"` / `"GET key"` / `"LIST prefix"`
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, handle: &S3Handle) -> Result<HeadObject, StoreError> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.lock();
        inner.calls.push(format!("HEAD {}", handle.key));
        if let Some(err) = inner.head_failures.get(&slot(handle)) {
            return Err(err.clone());
        }
        let obj = inner.objects.get(&slot(handle)).ok_or_else(|| {
            StoreError::new(404, "NotFound", "Not Found")
        })?;
        Ok(HeadObject {
            content_length: obj.body.len() as u64,
            storage_class: obj.storage_class.clone(),
            delete_marker: obj.delete_marker,
        })
    }

    async fn get_object(
        &self,
        handle: &S3Handle,
        range: Option<ByteRange>,
    ) -> Result<GetObject, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.lock();
        inner.calls.push(format!("GET {}", handle.key));
        if let Some(err) = inner.get_failures.get(&slot(handle)) {
            return Err(err.clone());
        }
        let obj = inner.objects.get(&slot(handle)).ok_or_else(no_such_key)?;
        if obj.delete_marker {
            return Err(StoreError::new(404, "NoSuchKey", "Delete marker").with_delete_marker());
        }
        if obj.storage_class.as_deref() == Some("GLACIER") {
            return Err(StoreError::new(
                403,
                "InvalidObjectState",
                "The operation is not valid for the object's storage class",
            ));
        }

        let total = obj.body.len() as u64;
        match range {
            Some(range) if total > 0 => {
                let end = range.end.min(total - 1);
                let start = range.start.min(end);
                Ok(GetObject {
                    body: obj.body.slice(start as usize..=end as usize),
                    content_range: Some(format!("bytes {}-{}/{}", start, end, total)),
                })
            }
            _ => Ok(GetObject {
                body: obj.body.clone(),
                content_range: None,
            }),
        }
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<S3Handle>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(format!("LIST {}", prefix));
        let mut keys: Vec<S3Handle> = inner
            .objects
            .keys()
            .filter(|(b, k)| {
                b == bucket
                    && k.starts_with(prefix)
                    && !k[prefix.len()..].contains('/')
            })
            .map(|(b, k)| S3Handle::new(b.clone(), k.clone()))
            .collect();
        keys.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(keys)
    }
}

impl Signer for MemoryStore {
    fn sign(&self, handle: &S3Handle, options: &SignOptions) -> String {
        let mut url = format!("memory://{}/{}", handle.bucket, handle.key);
        let mut params = Vec::new();
        if let Some(ref version) = handle.version {
            params.push(format!("versionId={}", version));
        }
        if let Some(ref content_type) = options.response_content_type {
            params.push(format!("response-content-type={}", content_type));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}
