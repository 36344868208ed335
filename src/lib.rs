//! catalog-preview - preview dispatch for a data catalog
//!
//! Turns an object in an S3-compatible store into a renderable preview:
//! an ordered loader registry picks a format family, a size and
//! object-state gate guards content fetches, and failures are classified
//! into a closed error taxonomy. Sandboxed HTML previews are backed by
//! browsing sessions that are refreshed until torn down.

pub mod app;
pub mod core;
pub mod error;
pub mod gate;
pub mod loaders;
pub mod registry;
pub mod services;
pub mod session;
pub mod store;

pub use error::{Error, Result};
