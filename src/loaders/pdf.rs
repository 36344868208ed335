//! First page of PDF and PowerPoint documents via the thumbnail service

use async_trait::async_trait;
use serde_json::Value;

use super::detect::{ext_is, strip_compression};
use super::fetch::check_binary_reply;
use super::{sign, LoadContext, Loader};
use crate::core::{ObjectHandle, PageDocument, PreviewData};
use crate::error::Result;
use crate::services::ThumbnailRequest;

/// Bounding box of the rendered page
pub const PAGE_SIZE: &str = "w1024h768";

pub struct PdfLoader;

#[async_trait]
impl Loader for PdfLoader {
    fn name(&self) -> &'static str {
        "pdf"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let kind = if ext_is(strip_compression(handle.detection_key()), ".pptx") {
            PageDocument::Pptx
        } else {
            PageDocument::Pdf
        };
        let request = ThumbnailRequest {
            url: sign(ctx, handle),
            input: kind.as_str().to_string(),
            size: PAGE_SIZE.to_string(),
            page: 1,
            count_pages: true,
        };
        let reply = ctx.env.service.thumbnail(&request).await?;
        check_binary_reply(&reply, handle, "thumbnail")?;

        let pages = reply
            .info
            .as_ref()
            .and_then(|info| info.get("page_count"))
            .and_then(Value::as_u64)
            .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX));
        Ok(PreviewData::Pdf {
            handle: handle.clone(),
            pages,
            first_page_blob: reply.body,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::core::{PreviewError, S3Handle};
    use crate::error::Error;
    use crate::loaders::testing::{ctx, env, CannedService};
    use crate::loaders::LoadOptions;
    use crate::services::BinaryReply;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_page_count_from_info_header() {
        let store = MemoryStore::new();
        let svc = Arc::new(CannedService::with_binary(BinaryReply {
            status: 200,
            body: Bytes::from_static(b"\x89PNG"),
            info: Some(json!({ "page_count": 12 })),
        }));
        let c = ctx(env(&store, svc.clone()), LoadOptions::default());
        let h: ObjectHandle = S3Handle::new("b", "deck.pptx").into();

        match PdfLoader.load(&c, &h).await.unwrap() {
            PreviewData::Pdf {
                pages,
                first_page_blob,
                kind,
                ..
            } => {
                assert_eq!(pages, 12);
                assert_eq!(&first_page_blob[..], b"\x89PNG");
                assert_eq!(kind, PageDocument::Pptx);
            }
            other => panic!("unexpected {:?}", other),
        }

        let requests = svc.thumbnails.lock().unwrap();
        assert_eq!(requests[0].input, "pptx");
        assert!(requests[0].count_pages);
    }

    #[tokio::test]
    async fn test_oversized_page_count_saturates() {
        let store = MemoryStore::new();
        let svc = Arc::new(CannedService::with_binary(BinaryReply {
            status: 200,
            body: Bytes::from_static(b"\x89PNG"),
            info: Some(json!({ "page_count": u64::from(u32::MAX) + 5 })),
        }));
        let c = ctx(env(&store, svc), LoadOptions::default());
        let h: ObjectHandle = S3Handle::new("b", "huge.pdf").into();

        match PdfLoader.load(&c, &h).await.unwrap() {
            PreviewData::Pdf { pages, .. } => assert_eq!(pages, u32::MAX),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_document() {
        let store = MemoryStore::new();
        let svc = Arc::new(CannedService::with_binary(BinaryReply {
            status: 404,
            ..Default::default()
        }));
        let c = ctx(env(&store, svc), LoadOptions::default());
        let h: ObjectHandle = S3Handle::new("b", "paper.pdf").into();

        let err = PdfLoader.load(&c, &h).await.unwrap_err();
        assert!(matches!(err, Error::Preview(PreviewError::DoesNotExist { .. })));
    }
}
