//! Backend service collaborators
//!
//! - JSON preview, tabular preview and thumbnail endpoints
//! - Browsing-session mutations
//! - URL builders shared by loaders

pub mod endpoints;
pub mod preview;
pub mod session;

pub use endpoints::Endpoints;
pub use preview::{
    BinaryReply, HttpPreviewService, PreviewRequest, PreviewService, SizeTier, TabularRequest,
    ThumbnailRequest, INFO_HEADER,
};
pub use session::{BrowsingSession, GraphqlSessionApi, SessionApi, SessionReply};
