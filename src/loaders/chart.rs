//! Chart (Vega, ECharts) and genome browser (IGV) specs
//!
//! These are the dedicated spec paths: content that fails to parse is a
//! `MalformedJson` error. Relative data sources are rewritten into signed
//! URLs of sibling objects.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::fetch::get_object;
use super::{check_gate, LoadContext, Loader};
use crate::core::{ObjectHandle, PreviewData, PreviewError};
use crate::error::Result;
use crate::store::SignOptions;

static VEGA_SCHEMA: OnceLock<Option<Regex>> = OnceLock::new();

fn vega_schema_re() -> Option<&'static Regex> {
    VEGA_SCHEMA
        .get_or_init(|| {
            Regex::new(r#""\$schema"\s*:\s*"https://vega\.github\.io/schema/([\w-]+)/([\w.-]+)\.json""#)
                .ok()
        })
        .as_ref()
}

/// Whether raw JSON text declares a Vega or Vega-Lite schema
pub fn has_vega_schema(text: &str) -> bool {
    vega_schema_re().is_some_and(|re| re.is_match(text))
}

/// Whether a parsed document looks like IGV browser options
pub fn is_igv_options(value: &Value) -> bool {
    value.get("genome").is_some() && value.get("tracks").is_some_and(Value::is_array)
}

fn is_relative(url: &str) -> bool {
    !url.contains("://") && !url.starts_with('/') && !url.starts_with("data:")
}

/// Sign a source path relative to `handle`.
///
/// Absolute URLs are returned unchanged; a relative path that does not
/// resolve to an existing object fails with `SrcDoesNotExist`.
pub async fn sign_relative(ctx: &LoadContext, handle: &ObjectHandle, url: &str) -> Result<String> {
    if !is_relative(url) {
        return Ok(url.to_string());
    }
    let missing = || PreviewError::SrcDoesNotExist {
        path: url.to_string(),
    };
    let sibling = handle.location.sibling(url).ok_or_else(missing)?;
    if let Err(e) = ctx.env.store.head_object(&sibling).await {
        debug!(path = url, error = %e, "relative source not found");
        return Err(missing().into());
    }
    Ok(ctx.env.signer.sign(&sibling, &SignOptions::default()))
}

async fn sign_field(ctx: &LoadContext, handle: &ObjectHandle, obj: &mut Value, field: &str) -> Result<()> {
    if let Some(url) = obj.get(field).and_then(Value::as_str).map(String::from) {
        obj[field] = Value::String(sign_relative(ctx, handle, &url).await?);
    }
    Ok(())
}

/// Rewrite relative `data[].url` (and a top-level `data.url`) of a Vega spec
pub async fn sign_vega_spec(ctx: &LoadContext, handle: &ObjectHandle, mut spec: Value) -> Result<Value> {
    match spec.get_mut("data") {
        Some(Value::Array(items)) => {
            for item in items.iter_mut() {
                sign_field(ctx, handle, item, "url").await?;
            }
        }
        Some(data @ Value::Object(_)) => sign_field(ctx, handle, data, "url").await?,
        _ => {}
    }
    Ok(spec)
}

/// Rewrite relative `tracks[].url` and `tracks[].indexURL` of IGV options
pub async fn sign_igv_options(ctx: &LoadContext, handle: &ObjectHandle, mut options: Value) -> Result<Value> {
    if let Some(Value::Array(tracks)) = options.get_mut("tracks") {
        for track in tracks.iter_mut() {
            sign_field(ctx, handle, track, "url").await?;
            sign_field(ctx, handle, track, "indexURL").await?;
        }
    }
    Ok(options)
}

async fn load_json(ctx: &LoadContext, handle: &ObjectHandle) -> Result<Value> {
    check_gate(ctx, handle).await?;
    let object = get_object(ctx.env.store.as_ref(), handle).await?;
    serde_json::from_slice(&object.body).map_err(|e| {
        PreviewError::MalformedJson {
            handle: handle.clone(),
            message: e.to_string(),
        }
        .into()
    })
}

pub struct VegaLoader;

#[async_trait]
impl Loader for VegaLoader {
    fn name(&self) -> &'static str {
        "vega"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let spec = load_json(ctx, handle).await?;
        let spec = sign_vega_spec(ctx, handle, spec).await?;
        Ok(PreviewData::Vega { spec })
    }
}

pub struct EChartsLoader;

#[async_trait]
impl Loader for EChartsLoader {
    fn name(&self) -> &'static str {
        "echarts"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let mut option = load_json(ctx, handle).await?;
        match option.get_mut("dataset") {
            Some(Value::Array(items)) => {
                for item in items.iter_mut() {
                    sign_field(ctx, handle, item, "source").await?;
                }
            }
            Some(dataset @ Value::Object(_)) => sign_field(ctx, handle, dataset, "source").await?,
            _ => {}
        }
        Ok(PreviewData::ECharts { option })
    }
}

pub struct IgvLoader;

#[async_trait]
impl Loader for IgvLoader {
    fn name(&self) -> &'static str {
        "igv"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let options = load_json(ctx, handle).await?;
        let options = sign_igv_options(ctx, handle, options).await?;
        Ok(PreviewData::Igv { options })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::core::S3Handle;
    use crate::error::Error;
    use crate::loaders::testing::{ctx, env, CannedService};
    use crate::loaders::LoadOptions;
    use crate::store::MemoryStore;

    fn handle(key: &str) -> ObjectHandle {
        S3Handle::new("b", key).into()
    }

    #[test]
    fn test_schema_sniffing() {
        assert!(has_vega_schema(
            r#"{"$schema": "https://vega.github.io/schema/vega-lite/v5.json", "mark": "bar"}"#
        ));
        assert!(!has_vega_schema(r#"{"$schema": "https://json-schema.org/draft-07/schema"}"#));
    }

    #[test]
    fn test_igv_detection() {
        assert!(is_igv_options(&json!({ "genome": "hg38", "tracks": [] })));
        assert!(!is_igv_options(&json!({ "genome": "hg38" })));
    }

    #[tokio::test]
    async fn test_vega_relative_data_is_signed() {
        let store = MemoryStore::new();
        store
            .put(
                "b",
                "charts/bar.json",
                r#"{"data": [{"url": "../data/values.csv"}, {"url": "https://x/y.csv"}]}"#,
            )
            .put("b", "data/values.csv", "a,b\n1,2\n");
        let c = ctx(env(&store, Arc::new(CannedService::default())), LoadOptions::default());

        match VegaLoader.load(&c, &handle("charts/bar.json")).await.unwrap() {
            PreviewData::Vega { spec } => {
                let first = spec["data"][0]["url"].as_str().unwrap();
                assert!(first.starts_with("memory://b/data/values.csv"));
                assert_eq!(spec["data"][1]["url"], "https://x/y.csv");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_relative_source() {
        let store = MemoryStore::new();
        store.put(
            "b",
            "igv.json",
            r#"{"genome": "hg38", "tracks": [{"url": "reads.bam", "indexURL": "reads.bam.bai"}]}"#,
        );
        let c = ctx(env(&store, Arc::new(CannedService::default())), LoadOptions::default());

        match IgvLoader.load(&c, &handle("igv.json")).await {
            Err(Error::Preview(PreviewError::SrcDoesNotExist { path })) => {
                assert_eq!(path, "reads.bam")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dedicated_path_reports_malformed_json() {
        let store = MemoryStore::new();
        store.put(
            "b",
            "chart.json",
            r#"{"$schema": "https://vega.github.io/schema/vega/v5.json", "data": }"#,
        );
        let c = ctx(env(&store, Arc::new(CannedService::default())), LoadOptions::default());

        let err = VegaLoader.load(&c, &handle("chart.json")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Preview(PreviewError::MalformedJson { .. })
        ));
    }
}
