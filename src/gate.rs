//! Size and object-state gate
//!
//! Inspects object metadata before committing to a content fetch. Delete
//! markers and archive tiers are checked before size, and version-specific
//! error classification only applies when a version was requested.

use serde::Deserialize;
use tracing::debug;

use crate::core::{ObjectHandle, PreviewError};
use crate::error::{Error, Result};
use crate::store::{HeadObject, ObjectStore, StoreError};

/// Byte thresholds consumed by [`gate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SizeThresholds {
    /// Objects up to this size are fetched automatically
    pub auto_fetch: u64,
    /// Objects above this size are never fetched
    pub never_fetch: u64,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            auto_fetch: 128 * 1024,
            never_fetch: 1024 * 1024,
        }
    }
}

/// Classify a failed HEAD request.
///
/// Unrecognized failures are returned unchanged as [`Error::Store`].
pub fn classify_head_error(handle: &ObjectHandle, e: StoreError) -> Error {
    let versioned = handle.version().is_some();
    let handle = handle.clone();

    // GET and HEAD are not allowed on delete markers
    if e.status == 405 && versioned {
        return PreviewError::Deleted { handle }.into();
    }
    if e.code == "BadRequest" && versioned {
        return PreviewError::InvalidVersion { handle }.into();
    }
    if e.code == "NotFound" && e.delete_marker {
        return PreviewError::Deleted { handle }.into();
    }
    if e.code == "NoSuchKey" || e.code == "NotFound" {
        return PreviewError::DoesNotExist { handle }.into();
    }
    Error::Store(e)
}

/// HEAD the object and reject deleted or archived ones
pub async fn head_checked(store: &dyn ObjectStore, handle: &ObjectHandle) -> Result<HeadObject> {
    let head = store
        .head_object(&handle.location)
        .await
        .map_err(|e| classify_head_error(handle, e))?;

    if head.delete_marker {
        return Err(PreviewError::Deleted {
            handle: handle.clone(),
        }
        .into());
    }
    if head.is_archived() {
        return Err(PreviewError::Archived {
            handle: handle.clone(),
        }
        .into());
    }
    Ok(head)
}

/// Decide whether an object may be fetched.
///
/// Returns `false` when it is small enough to fetch automatically and
/// `true` when it may only be fetched after an explicit user action.
/// Fails with a [`PreviewError`] for deleted, archived, missing, invalid
/// version and too-large objects.
pub async fn gate(
    store: &dyn ObjectStore,
    handle: &ObjectHandle,
    thresholds: &SizeThresholds,
) -> Result<bool> {
    let head = head_checked(store, handle).await?;
    let length = head.content_length;
    debug!(
        bucket = handle.bucket(),
        key = handle.key(),
        length,
        "gate"
    );

    if length > thresholds.never_fetch {
        return Err(PreviewError::TooLarge {
            handle: handle.clone(),
        }
        .into());
    }
    Ok(length > thresholds.auto_fetch)
}
