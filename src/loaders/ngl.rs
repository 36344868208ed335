//! Molecule structures for the 3D viewer

use std::io::Read;

use async_trait::async_trait;
use bytes::Bytes;

use super::detect::{extension, get_compression, strip_compression};
use super::fetch::get_object;
use super::{check_gate, LoadContext, Loader};
use crate::core::{ObjectHandle, PreviewData, PreviewError};
use crate::error::Result;

pub const MOLECULE_EXTENSIONS: &[&str] =
    &[".pdb", ".cif", ".sdf", ".mol", ".mol2", ".ent", ".xyz"];

/// Inflate a gzip body of `handle`, failing with `TooLarge` past `limit` bytes
pub fn gunzip(body: &[u8], limit: u64, handle: &ObjectHandle) -> Result<Bytes> {
    let decoder = flate2::read::GzDecoder::new(body);
    let mut out = Vec::new();
    // One byte past the limit tells a full-size body from an oversized one
    decoder.take(limit.saturating_add(1)).read_to_end(&mut out)?;
    if out.len() as u64 > limit {
        return Err(PreviewError::TooLarge {
            handle: handle.clone(),
        }
        .into());
    }
    Ok(Bytes::from(out))
}

pub struct NglLoader;

#[async_trait]
impl Loader for NglLoader {
    fn name(&self) -> &'static str {
        "ngl"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        check_gate(ctx, handle).await?;
        let object = get_object(ctx.env.store.as_ref(), handle).await?;

        let key = handle.detection_key();
        let blob = match get_compression(key) {
            Some("gz") => gunzip(&object.body, ctx.env.limits.inflate_max_bytes, handle)?,
            _ => object.body,
        };
        let ext = extension(strip_compression(key))
            .map(|e| e.trim_start_matches('.').to_string())
            .unwrap_or_default();
        Ok(PreviewData::Ngl { blob, ext })
    }
}
