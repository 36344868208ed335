//! Closed taxonomy of preview failures

use std::fmt;
use std::sync::Arc;

use super::action::Action;
use super::handle::ObjectHandle;

/// Underlying failure kept by [`PreviewError::Unexpected`]
#[derive(Debug, Clone)]
pub struct Original(pub Arc<crate::error::Error>);

impl PartialEq for Original {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Original {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Every domain failure a loader can report
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreviewError {
    #[error("{handle} has been deleted")]
    Deleted { handle: ObjectHandle },

    #[error("{handle} is archived")]
    Archived { handle: ObjectHandle },

    #[error("{handle}: invalid version")]
    InvalidVersion { handle: ObjectHandle },

    #[error("access to {handle} is forbidden")]
    Forbidden { handle: ObjectHandle },

    #[error("{handle} must be loaded explicitly")]
    Gated { handle: ObjectHandle, load: Action },

    #[error("{handle} is too large to preview")]
    TooLarge { handle: ObjectHandle },

    #[error("preview of {handle} is not supported")]
    Unsupported { handle: ObjectHandle },

    #[error("{handle} does not exist")]
    DoesNotExist { handle: ObjectHandle },

    #[error("source {path} does not exist")]
    SrcDoesNotExist { path: String },

    #[error("malformed JSON in {handle}: {message}")]
    MalformedJson { handle: ObjectHandle, message: String },

    #[error("unexpected error loading {handle}: {original}")]
    Unexpected {
        handle: ObjectHandle,
        retry: Option<Action>,
        original: Original,
    },

    #[error("browsing session expired")]
    Expired { retry: Action },
}

/// Coarse grouping of [`PreviewError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Deleted, archived, missing or bad version
    ObjectState,
    Access,
    /// Gated, too large or unsupported
    Policy,
    Data,
    Session,
    Unexpected,
}

impl PreviewError {
    pub fn unexpected(
        handle: ObjectHandle,
        retry: Option<Action>,
        original: crate::error::Error,
    ) -> Self {
        Self::Unexpected {
            handle,
            retry,
            original: Original(Arc::new(original)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PreviewError::Deleted { .. }
            | PreviewError::Archived { .. }
            | PreviewError::DoesNotExist { .. }
            | PreviewError::InvalidVersion { .. } => ErrorKind::ObjectState,
            PreviewError::Forbidden { .. } => ErrorKind::Access,
            PreviewError::TooLarge { .. }
            | PreviewError::Gated { .. }
            | PreviewError::Unsupported { .. } => ErrorKind::Policy,
            PreviewError::MalformedJson { .. } | PreviewError::SrcDoesNotExist { .. } => {
                ErrorKind::Data
            }
            PreviewError::Expired { .. } => ErrorKind::Session,
            PreviewError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Handle the error refers to, when it refers to one
    pub fn handle(&self) -> Option<&ObjectHandle> {
        match self {
            PreviewError::Deleted { handle }
            | PreviewError::Archived { handle }
            | PreviewError::InvalidVersion { handle }
            | PreviewError::Forbidden { handle }
            | PreviewError::Gated { handle, .. }
            | PreviewError::TooLarge { handle }
            | PreviewError::Unsupported { handle }
            | PreviewError::DoesNotExist { handle }
            | PreviewError::MalformedJson { handle, .. }
            | PreviewError::Unexpected { handle, .. } => Some(handle),
            PreviewError::SrcDoesNotExist { .. } | PreviewError::Expired { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::S3Handle;

    fn handle() -> ObjectHandle {
        S3Handle::new("bucket", "file.json").into()
    }

    #[test]
    fn test_display() {
        let err = PreviewError::DoesNotExist { handle: handle() };
        assert_eq!(err.to_string(), "s3://bucket/file.json does not exist");

        let err = PreviewError::SrcDoesNotExist {
            path: "data.csv".into(),
        };
        assert_eq!(err.to_string(), "source data.csv does not exist");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            PreviewError::Archived { handle: handle() }.kind(),
            ErrorKind::ObjectState
        );
        assert_eq!(
            PreviewError::Gated {
                handle: handle(),
                load: Action::noop()
            }
            .kind(),
            ErrorKind::Policy
        );
        assert_eq!(
            PreviewError::Expired {
                retry: Action::noop()
            }
            .kind(),
            ErrorKind::Session
        );
    }

    #[test]
    fn test_unexpected_keeps_original() {
        let err = PreviewError::unexpected(handle(), None, crate::error::Error::internal("boom"));
        assert!(err.to_string().contains("boom"));
        assert!(err.handle().is_some());
    }
}
