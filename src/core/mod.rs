//! Core module - Result algebra, handles and preview taxonomies

pub mod action;
pub mod data;
pub mod handle;
pub mod mode;
pub mod preview_error;
pub mod result;

pub use action::{Action, ChangeHandler};
pub use data::{
    Highlighted, IFrameSource, PageDocument, PreviewData, Rgb, StyledLine, StyledSegment,
    TabularData, TabularFormat,
};
pub use handle::{ObjectHandle, PackageHandle, S3Handle};
pub use mode::{Context, FileType};
pub use preview_error::{ErrorKind, Original, PreviewError};
pub use result::{AsyncResult, Tag};

/// Result of one preview load
pub type PreviewResult = AsyncResult<PreviewData, PreviewError>;
