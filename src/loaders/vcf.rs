//! Variant call format previews

use async_trait::async_trait;
use serde_json::Value;

use super::detect::get_compression;
use super::fetch::fetch_preview;
use super::{sign, LoadContext, Loader};
use crate::core::{ObjectHandle, PreviewData};
use crate::error::Result;
use crate::services::PreviewRequest;

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub struct VcfLoader;

#[async_trait]
impl Loader for VcfLoader {
    fn name(&self) -> &'static str {
        "vcf"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let mut request = PreviewRequest::new(sign(ctx, handle), "vcf");
        request.compression = get_compression(handle.key()).map(String::from);
        let json = fetch_preview(ctx.env.service.as_ref(), handle, &request).await?;

        let info = json.get("info").unwrap_or(&Value::Null);
        let data = info.get("data").unwrap_or(&Value::Null);
        let rows = data
            .get("data")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(|row| strings(Some(row))).collect())
            .unwrap_or_default();

        Ok(PreviewData::Vcf {
            meta: strings(data.get("meta")),
            header: strings(data.get("header")),
            data: rows,
            variants: strings(info.get("metadata").and_then(|m| m.get("variants"))),
        })
    }
}
