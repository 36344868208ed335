//! Format-family loaders
//!
//! A loader turns an [`ObjectHandle`] into a [`PreviewData`] by driving one
//! or more network calls. Its body returns `crate::Result`; [`run`] is the
//! single classification boundary that turns failures into a
//! [`PreviewError`].

pub mod chart;
pub mod context;
pub mod detect;
pub mod editor;
pub mod fcs;
pub mod fetch;
pub mod highlight;
pub mod html;
pub mod json;
pub mod markdown;
pub mod media;
pub mod ngl;
pub mod notebook;
pub mod pdf;
pub mod tabular;
pub mod text;
pub mod vcf;

use async_trait::async_trait;
use tracing::error;

use crate::core::{Action, AsyncResult, ObjectHandle, PreviewData, PreviewError, PreviewResult};
use crate::error::{Error, Result};
use crate::gate::gate;
use crate::store::SignOptions;

pub use context::{BucketPolicy, Drafts, Env, Limits, LoadContext, LoadOptions, Publisher};

/// One format family
#[async_trait]
pub trait Loader: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData>;
}

/// Run `loader` and classify its outcome
pub async fn run(loader: &dyn Loader, ctx: &LoadContext, handle: &ObjectHandle) -> PreviewResult {
    match loader.load(ctx, handle).await {
        Ok(data) => AsyncResult::Ok(data),
        Err(e) => AsyncResult::Err(handle_error(e, handle, Some(ctx.retry()))),
    }
}

/// Classify a loader failure.
///
/// An already classified [`PreviewError`] passes through unchanged;
/// anything else is logged here, once, and becomes `Unexpected`.
pub fn handle_error(e: Error, handle: &ObjectHandle, retry: Option<Action>) -> PreviewError {
    match e {
        Error::Preview(e) => e,
        other => {
            error!(
                bucket = handle.bucket(),
                key = handle.key(),
                error = %other,
                "error loading preview"
            );
            PreviewError::unexpected(handle.clone(), retry, other)
        }
    }
}

/// Run the gate and turn the deferred band into `Gated` unless the caller
/// opted in. Returns whether the object was in the deferred band.
pub async fn check_gate(ctx: &LoadContext, handle: &ObjectHandle) -> Result<bool> {
    let gated = gate(ctx.env.store.as_ref(), handle, &ctx.env.thresholds).await?;
    if gated && !ctx.options.force {
        return Err(PreviewError::Gated {
            handle: handle.clone(),
            load: ctx.unlock(),
        }
        .into());
    }
    Ok(gated)
}

/// Signed URL of the object
pub fn sign(ctx: &LoadContext, handle: &ObjectHandle) -> String {
    ctx.env.signer.sign(&handle.location, &SignOptions::default())
}

/// Signed URL of the object served with an explicit content type
pub fn sign_as(ctx: &LoadContext, handle: &ObjectHandle, content_type: &str) -> String {
    ctx.env.signer.sign(
        &handle.location,
        &SignOptions {
            response_content_type: Some(content_type.to_string()),
        },
    )
}

/// Catch-all: every object it is asked for is unsupported
pub struct UnsupportedLoader;

#[async_trait]
impl Loader for UnsupportedLoader {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    async fn load(&self, _ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        Err(PreviewError::Unsupported {
            handle: handle.clone(),
        }
        .into())
    }
}
