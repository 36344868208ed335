//! Markdown rendered to HTML

use async_trait::async_trait;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

use super::fetch::get_object;
use super::{check_gate, LoadContext, Loader};
use crate::core::{FileType, ObjectHandle, PreviewData};
use crate::error::Result;
use crate::store::SignOptions;

/// Render markdown to HTML, rewriting relative image sources with `sign`
pub fn render_markdown(markdown: &str, sign: impl Fn(&str) -> Option<String>) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            let dest_url = match sign(&dest_url) {
                Some(signed) => CowStr::from(signed),
                None => dest_url,
            };
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            })
        }
        other => other,
    });
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

pub struct MarkdownLoader;

#[async_trait]
impl Loader for MarkdownLoader {
    fn name(&self) -> &'static str {
        "markdown"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        check_gate(ctx, handle).await?;
        let object = get_object(ctx.env.store.as_ref(), handle).await?;
        let content = String::from_utf8_lossy(&object.body);

        let rendered = render_markdown(&content, |src| {
            if src.contains("://") || src.starts_with('/') || src.starts_with("data:") {
                return None;
            }
            let sibling = handle.location.sibling(src)?;
            Some(ctx.env.signer.sign(&sibling, &SignOptions::default()))
        });
        Ok(PreviewData::Markdown {
            rendered,
            modes: vec![FileType::Markdown, FileType::Text],
        })
    }
}
