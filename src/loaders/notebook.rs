//! Jupyter notebooks, rendered by the preview service or served by Voila

use async_trait::async_trait;
use serde_json::Value;

use super::detect::get_compression;
use super::fetch::{fetch_preview, info_str};
use super::{check_gate, sign, LoadContext, Loader};
use crate::core::{FileType, ObjectHandle, PreviewData};
use crate::error::{Error, Result};
use crate::services::PreviewRequest;

/// Sandbox flags for Voila dashboards
pub const VOILA_SANDBOX: &str = "allow-scripts allow-same-origin allow-downloads allow-forms";

fn modes(ctx: &LoadContext) -> Vec<FileType> {
    let mut modes = vec![FileType::Jupyter, FileType::Json, FileType::Text];
    if ctx.env.buckets.voila {
        modes.push(FileType::Voila);
    }
    modes
}

pub struct NotebookLoader;

#[async_trait]
impl Loader for NotebookLoader {
    fn name(&self) -> &'static str {
        "notebook"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        check_gate(ctx, handle).await?;

        let mut request = PreviewRequest::new(sign(ctx, handle), "ipynb");
        request.compression = get_compression(handle.key()).map(String::from);
        let json = fetch_preview(ctx.env.service.as_ref(), handle, &request).await?;

        let preview = json
            .get("html")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::parse("notebook preview without html"))?
            .to_string();
        let info = json.get("info").cloned().unwrap_or(Value::Null);
        Ok(PreviewData::Notebook {
            preview,
            note: info_str(&info, "note"),
            warnings: info_str(&info, "warnings"),
            modes: modes(ctx),
        })
    }
}

pub struct VoilaLoader;

#[async_trait]
impl Loader for VoilaLoader {
    fn name(&self) -> &'static str {
        "voila"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let src = ctx.env.endpoints.voila_url(&sign(ctx, handle));
        Ok(PreviewData::Voila {
            src,
            sandbox: VOILA_SANDBOX.to_string(),
            modes: modes(ctx),
        })
    }
}
