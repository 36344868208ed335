//! Object store collaborators
//!
//! The preview core only needs HEAD, ranged GET, a directory listing and a
//! URL signer. Both are injected as process-wide, read-only capabilities.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::S3Handle;

pub use http::{HttpStore, UrlSigner};
pub use memory::MemoryStore;

/// Failure reported by the object store, with its coded error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code} ({status}): {message}")]
pub struct StoreError {
    /// HTTP status of the failed request
    pub status: u16,
    /// Service error code (`NoSuchKey`, `NotFound`, `BadRequest`, ...)
    pub code: String,
    pub message: String,
    /// `x-amz-delete-marker: true` was present on the error response
    pub delete_marker: bool,
}

impl StoreError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            delete_marker: false,
        }
    }

    pub fn with_delete_marker(mut self) -> Self {
        self.delete_marker = true;
        self
    }

    /// Code S3 uses for a body-less error response with this status
    pub fn code_for_status(status: u16) -> &'static str {
        match status {
            400 => "BadRequest",
            403 => "Forbidden",
            404 => "NotFound",
            405 => "MethodNotAllowed",
            412 => "PreconditionFailed",
            _ => "UnknownError",
        }
    }
}

/// Metadata returned by a HEAD request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeadObject {
    pub content_length: u64,
    pub storage_class: Option<String>,
    pub delete_marker: bool,
}

impl HeadObject {
    /// Whether the storage class requires a restore before reading
    pub fn is_archived(&self) -> bool {
        matches!(
            self.storage_class.as_deref(),
            Some("GLACIER") | Some("DEEP_ARCHIVE")
        )
    }
}

/// Body (or part of it) returned by a GET request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetObject {
    pub body: Bytes,
    /// `Content-Range` header of a ranged response
    pub content_range: Option<String>,
}

/// Inclusive byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Minimal object-store client
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head_object(&self, handle: &S3Handle) -> Result<HeadObject, StoreError>;

    async fn get_object(
        &self,
        handle: &S3Handle,
        range: Option<ByteRange>,
    ) -> Result<GetObject, StoreError>;

    /// Objects directly under `prefix` (non-recursive)
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<S3Handle>, StoreError>;
}

/// Options applied when signing a URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignOptions {
    /// Override for the `Content-Type` the store responds with
    pub response_content_type: Option<String>,
}

/// Produces browser-fetchable URLs for objects
pub trait Signer: Send + Sync {
    fn sign(&self, handle: &S3Handle, options: &SignOptions) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archived_storage_classes() {
        let mut head = HeadObject::default();
        assert!(!head.is_archived());
        head.storage_class = Some("GLACIER".into());
        assert!(head.is_archived());
        head.storage_class = Some("DEEP_ARCHIVE".into());
        assert!(head.is_archived());
        head.storage_class = Some("STANDARD_IA".into());
        assert!(!head.is_archived());
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::new(404, "NoSuchKey", "The specified key does not exist.");
        assert_eq!(
            err.to_string(),
            "NoSuchKey (404): The specified key does not exist."
        );
        assert_eq!(StoreError::code_for_status(405), "MethodNotAllowed");
    }
}
