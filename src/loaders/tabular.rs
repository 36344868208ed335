//! Tabular previews (delimited text, spreadsheets, parquet, jsonl, h5ad)
//!
//! The response tier follows the context: listings ask for `small`,
//! objects in the deferred size band for `medium`, full views for `large`.
//! An explicit tier (set by "load more") wins.

use async_trait::async_trait;
use serde_json::Value;

use super::detect::{extension, get_compression, strip_compression};
use super::fetch::check_binary_reply;
use super::{sign, LoadContext, Loader};
use crate::core::{
    Context, ObjectHandle, PreviewData, PreviewError, TabularData, TabularFormat,
};
use crate::error::{Error, Result};
use crate::gate::gate;
use crate::services::{SizeTier, TabularRequest};

pub const TABULAR_EXTENSIONS: &[&str] = &[
    ".csv", ".tsv", ".tab", ".xls", ".xlsx", ".xlsm", ".parquet", ".pq", ".jsonl", ".h5ad",
];

const ARROW_MAGIC: &[u8] = b"ARROW1";

/// Service input type and column separator for a key
pub fn input_for(key: &str) -> (&'static str, Option<&'static str>) {
    match extension(strip_compression(key)).as_deref() {
        Some(".tsv") | Some(".tab") => ("csv", Some("\t")),
        Some(".xls") | Some(".xlsx") | Some(".xlsm") => ("excel", None),
        Some(".parquet") | Some(".pq") => ("parquet", None),
        Some(".jsonl") => ("jsonl", None),
        Some(".h5ad") => ("h5ad", None),
        _ => ("csv", None),
    }
}

/// Tier to request given the caller context and gate state
pub fn size_tier(context: Context, gated: bool, explicit: Option<SizeTier>) -> SizeTier {
    if let Some(size) = explicit {
        return size;
    }
    match context {
        Context::Listing => SizeTier::Small,
        Context::File if gated => SizeTier::Medium,
        Context::File => SizeTier::Large,
    }
}

pub struct TabularLoader;

#[async_trait]
impl Loader for TabularLoader {
    fn name(&self) -> &'static str {
        "tabular"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        // The service bounds its payload, so sizes past the gate only shrink the tier
        let gated = match gate(ctx.env.store.as_ref(), handle, &ctx.env.thresholds).await {
            Ok(gated) => gated,
            Err(Error::Preview(PreviewError::TooLarge { .. })) => true,
            Err(e) => return Err(e),
        };
        let size = size_tier(ctx.options.context, gated, ctx.options.size);
        let (input, separator) = input_for(handle.detection_key());

        let request = TabularRequest {
            url: sign(ctx, handle),
            input: input.to_string(),
            size,
            compression: get_compression(handle.key()).map(String::from),
            separator: separator.map(String::from),
        };
        let reply = ctx.env.service.tabular(&request).await?;
        check_binary_reply(&reply, handle, "tabular preview")?;

        let info = reply.info.unwrap_or(Value::Null);
        let truncated = info.get("truncated").and_then(Value::as_bool).unwrap_or(false);
        let meta = info.get("meta").cloned().filter(|m| !m.is_null());
        let format = if reply.body.starts_with(ARROW_MAGIC) {
            TabularFormat::Arrow
        } else {
            TabularFormat::Csv
        };
        let load_more = (truncated && size < SizeTier::Large).then(|| ctx.load_more());

        Ok(PreviewData::Perspective {
            data: TabularData {
                body: reply.body,
                format,
            },
            meta,
            truncated,
            load_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::core::{Action, S3Handle};
    use crate::loaders::testing::{ctx, env, CannedService};
    use crate::loaders::LoadOptions;
    use crate::services::BinaryReply;
    use crate::store::MemoryStore;

    fn handle(key: &str) -> ObjectHandle {
        S3Handle::new("b", key).into()
    }

    #[test]
    fn test_input_for() {
        assert_eq!(input_for("a/b.csv.gz"), ("csv", None));
        assert_eq!(input_for("a/b.tsv"), ("csv", Some("\t")));
        assert_eq!(input_for("a/b.XLSX"), ("excel", None));
        assert_eq!(input_for("a/b.parquet"), ("parquet", None));
    }

    #[test]
    fn test_size_tier() {
        assert_eq!(size_tier(Context::Listing, false, None), SizeTier::Small);
        assert_eq!(size_tier(Context::Listing, true, None), SizeTier::Small);
        assert_eq!(size_tier(Context::File, true, None), SizeTier::Medium);
        assert_eq!(size_tier(Context::File, false, None), SizeTier::Large);
        assert_eq!(
            size_tier(Context::Listing, false, Some(SizeTier::Large)),
            SizeTier::Large
        );
    }

    #[tokio::test]
    async fn test_truncated_medium_offers_load_more() {
        let store = MemoryStore::new();
        store.put("b", "big.csv.gz", vec![b'1'; 200 * 1024]);
        let svc = Arc::new(CannedService::with_binary(BinaryReply {
            status: 200,
            body: Bytes::from_static(b"a,b\n1,2\n"),
            info: Some(json!({ "truncated": true })),
        }));
        let more = Action::noop();
        let c = ctx(env(&store, svc.clone()), LoadOptions::default()).with_actions(
            Action::noop(),
            Action::noop(),
            more.clone(),
        );

        match TabularLoader.load(&c, &handle("big.csv.gz")).await.unwrap() {
            PreviewData::Perspective {
                data,
                truncated,
                load_more,
                ..
            } => {
                assert_eq!(data.format, TabularFormat::Csv);
                assert!(truncated);
                assert_eq!(load_more, Some(more));
            }
            other => panic!("unexpected {:?}", other),
        }

        let requests = svc.tabulars.lock().unwrap();
        assert_eq!(requests[0].size, SizeTier::Medium);
        assert_eq!(requests[0].compression.as_deref(), Some("gz"));
    }

    #[tokio::test]
    async fn test_large_tier_has_no_load_more() {
        let store = MemoryStore::new();
        store.put("b", "small.parquet", vec![0u8; 100]);
        let svc = Arc::new(CannedService::with_binary(BinaryReply {
            status: 200,
            body: Bytes::from_static(b"ARROW1\0\0"),
            info: Some(json!({ "truncated": true, "meta": { "num_rows": 10 } })),
        }));
        let c = ctx(env(&store, svc), LoadOptions::default());

        match TabularLoader.load(&c, &handle("small.parquet")).await.unwrap() {
            PreviewData::Perspective {
                data,
                meta,
                load_more,
                ..
            } => {
                assert_eq!(data.format, TabularFormat::Arrow);
                assert_eq!(meta, Some(json!({ "num_rows": 10 })));
                assert!(load_more.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_service_errors_are_classified() {
        let store = MemoryStore::new();
        store.put("b", "t.csv", "a\n");
        let svc = Arc::new(CannedService::with_binary(BinaryReply {
            status: 403,
            body: Bytes::from_static(b"<Code>AccessDenied</Code>"),
            info: None,
        }));
        let c = ctx(env(&store, svc), LoadOptions::default());

        let err = TabularLoader.load(&c, &handle("t.csv")).await.unwrap_err();
        assert!(matches!(err, Error::Preview(PreviewError::Forbidden { .. })));
    }
}
