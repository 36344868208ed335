//! Images, audio and video
//!
//! None of these fetch content here; the payload points the renderer at
//! the object (images) or at a transcoding URL (audio, video).

use async_trait::async_trait;

use super::{sign, LoadContext, Loader};
use crate::core::{ObjectHandle, PreviewData};
use crate::error::Result;
use crate::gate::head_checked;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".tif", ".tiff", ".svg", ".czi",
];
pub const AUDIO_EXTENSIONS: &[&str] = &[".flac", ".mp3", ".ogg", ".ts", ".tsa", ".wav"];
pub const VIDEO_EXTENSIONS: &[&str] = &[".m2t", ".m2ts", ".mp4", ".mpeg", ".webm"];

pub struct ImageLoader;

#[async_trait]
impl Loader for ImageLoader {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        head_checked(ctx.env.store.as_ref(), handle).await?;
        Ok(PreviewData::Image {
            handle: handle.clone(),
        })
    }
}

pub struct AudioLoader;

#[async_trait]
impl Loader for AudioLoader {
    fn name(&self) -> &'static str {
        "audio"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let src = ctx.env.endpoints.transcode_url(&sign(ctx, handle), "audio/mpeg");
        Ok(PreviewData::Audio { src })
    }
}

pub struct VideoLoader;

#[async_trait]
impl Loader for VideoLoader {
    fn name(&self) -> &'static str {
        "video"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let src = ctx.env.endpoints.transcode_url(&sign(ctx, handle), "video/mp4");
        Ok(PreviewData::Video { src })
    }
}
