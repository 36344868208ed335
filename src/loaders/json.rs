//! JSON with schema sniffing
//!
//! Small objects are read through a `sniff_bytes` prefix (the rest is only
//! fetched when the prefix is not the whole object), and only that prefix
//! is scanned for a Vega schema. A Vega or IGV document is routed to its
//! chart payload, anything else that parses is `Json`, and content that
//! does not parse is downgraded to highlighted `Text`. Large objects are
//! previewed as text without parsing.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::chart::{has_vega_schema, is_igv_options, sign_igv_options, sign_vega_spec};
use super::fetch::{first_bytes, get_object, parse_range};
use super::text::{load_text, text_data};
use super::{LoadContext, Loader};
use crate::core::{FileType, ObjectHandle, PreviewData, PreviewError};
use crate::error::{Error, Result};
use crate::gate::gate;

const LANG: &str = "json";

/// Longest prefix of `text` no longer than `max` bytes, on a char boundary
fn prefix(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub struct JsonLoader;

impl JsonLoader {
    async fn from_content(
        &self,
        ctx: &LoadContext,
        handle: &ObjectHandle,
        content: &str,
    ) -> Result<PreviewData> {
        let sniff = prefix(content, ctx.env.limits.sniff_bytes as usize);
        let is_vega = has_vega_schema(sniff);

        let parsed: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => {
                debug!(key = handle.key(), error = %e, vega = is_vega, "json downgraded to text");
                let head = prefix(content, ctx.env.limits.text_max_bytes as usize).to_string();
                return Ok(text_data(head, String::new(), LANG, None, None));
            }
        };

        if is_vega {
            let spec = sign_vega_spec(ctx, handle, parsed).await?;
            return Ok(PreviewData::Vega { spec });
        }
        if is_igv_options(&parsed) {
            let options = sign_igv_options(ctx, handle, parsed).await?;
            return Ok(PreviewData::Igv { options });
        }
        Ok(PreviewData::Json {
            rendered: parsed,
            modes: vec![FileType::Json, FileType::Text],
        })
    }
}

#[async_trait]
impl Loader for JsonLoader {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let whole = match gate(ctx.env.store.as_ref(), handle, &ctx.env.thresholds).await {
            Ok(gated) => !gated || ctx.options.force,
            Err(Error::Preview(PreviewError::TooLarge { .. })) => false,
            Err(e) => return Err(e),
        };
        if !whole {
            return load_text(ctx, handle, LANG, ctx.env.limits.text_max_bytes).await;
        }

        let store = ctx.env.store.as_ref();
        let sniff_bytes = ctx.env.limits.sniff_bytes;
        let mut object = first_bytes(store, handle, sniff_bytes).await?;
        let total = object.content_range.as_deref().and_then(parse_range);
        if total.is_some_and(|total| total > sniff_bytes) {
            object = get_object(store, handle).await?;
        }
        let content = String::from_utf8_lossy(&object.body);
        self.from_content(ctx, handle, &content).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::core::S3Handle;
    use crate::loaders::testing::{ctx, env, CannedService};
    use crate::loaders::LoadOptions;
    use crate::store::MemoryStore;

    fn handle(key: &str) -> ObjectHandle {
        S3Handle::new("b", key).into()
    }

    async fn load(store: &MemoryStore, key: &str) -> PreviewData {
        let svc = Arc::new(CannedService::with_preview(json!({
            "info": { "data": { "head": ["{"], "tail": ["}"] } }
        })));
        let c = ctx(env(store, svc), LoadOptions::default());
        JsonLoader.load(&c, &handle(key)).await.unwrap()
    }

    #[tokio::test]
    async fn test_plain_json() {
        let store = MemoryStore::new();
        store.put("b", "a.json", r#"{"a": [1, 2]}"#);
        match load(&store, "a.json").await {
            PreviewData::Json { rendered, modes } => {
                assert_eq!(rendered, json!({ "a": [1, 2] }));
                assert_eq!(modes, vec![FileType::Json, FileType::Text]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_downgrades_to_text() {
        let store = MemoryStore::new();
        store.put("b", "bad.json", r#"{"a": }"#);
        match load(&store, "bad.json").await {
            PreviewData::Text {
                head,
                lang,
                highlighted,
                ..
            } => {
                assert_eq!(head, r#"{"a": }"#);
                assert_eq!(lang, "json");
                assert_eq!(highlighted.head.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_chart_spec_is_text() {
        let store = MemoryStore::new();
        store.put(
            "b",
            "chart.json",
            r#"{"$schema": "https://vega.github.io/schema/vega-lite/v5.json", "mark": }"#,
        );
        assert!(matches!(
            load(&store, "chart.json").await,
            PreviewData::Text { ref lang, .. } if lang == "json"
        ));
    }

    #[tokio::test]
    async fn test_vega_and_igv_are_routed() {
        let store = MemoryStore::new();
        store
            .put(
                "b",
                "chart.json",
                r#"{"$schema": "https://vega.github.io/schema/vega-lite/v5.json", "mark": "bar"}"#,
            )
            .put("b", "igv.json", r#"{"genome": "hg38", "tracks": []}"#);
        assert!(matches!(load(&store, "chart.json").await, PreviewData::Vega { .. }));
        assert!(matches!(load(&store, "igv.json").await, PreviewData::Igv { .. }));
    }

    #[tokio::test]
    async fn test_large_json_is_previewed_as_text() {
        let store = MemoryStore::new();
        store.put("b", "big.json", vec![b' '; 2 * 1024 * 1024]);
        match load(&store, "big.json").await {
            PreviewData::Text { head, lang, .. } => {
                assert_eq!(head, "{");
                assert_eq!(lang, "json");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(store.get_count(), 0);
    }
}
