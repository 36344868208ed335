//! Flow cytometry (FCS) previews

use async_trait::async_trait;
use serde_json::Value;

use super::fetch::fetch_preview;
use super::{sign, LoadContext, Loader};
use crate::core::{ObjectHandle, PreviewData};
use crate::error::Result;
use crate::services::PreviewRequest;

pub struct FcsLoader;

#[async_trait]
impl Loader for FcsLoader {
    fn name(&self) -> &'static str {
        "fcs"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let request = PreviewRequest::new(sign(ctx, handle), "fcs");
        let json = fetch_preview(ctx.env.service.as_ref(), handle, &request).await?;

        let preview = json
            .get("html")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let metadata = json
            .get("info")
            .and_then(|info| info.get("metadata"))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(PreviewData::Fcs { preview, metadata })
    }
}
