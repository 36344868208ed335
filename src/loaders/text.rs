//! Plain-text previews through the preview service

use async_trait::async_trait;
use serde_json::Value;

use super::detect::{get_compression, language};
use super::fetch::{fetch_preview, head_tail, info_str};
use super::highlight::highlight_head_tail;
use super::{sign, LoadContext, Loader};
use crate::core::{ObjectHandle, PreviewData};
use crate::error::Result;
use crate::services::PreviewRequest;

/// Extensions previewed as text
pub const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".rst", ".rs", ".py", ".js", ".jsx", ".tsx", ".html", ".htm", ".css",
    ".json", ".toml", ".yaml", ".yml", ".xml", ".sh", ".bash", ".zsh", ".c", ".h", ".cpp",
    ".hpp", ".java", ".go", ".rb", ".php", ".sql", ".lua", ".hs", ".ml", ".ex", ".exs", ".erl",
    ".clj", ".swift", ".kt", ".scala", ".r", ".jl", ".pl", ".pm", ".conf", ".cfg", ".ini",
    ".env", ".log", ".csv", ".tsv", ".tab", ".fasta", ".fa", ".fastq", ".fq", ".sam", ".bed",
    ".gff", ".gtf", ".m", ".cwl", ".nf", ".wdl", ".snakefile", ".dockerfile", ".makefile",
    ".cmake", ".tex", ".bib", ".ipynb", ".rmd",
];

/// Build a highlighted text payload
pub fn text_data(
    head: String,
    tail: String,
    lang: &str,
    note: Option<String>,
    warnings: Option<String>,
) -> PreviewData {
    let highlighted = highlight_head_tail(&head, &tail, lang);
    PreviewData::Text {
        head,
        tail,
        lang: lang.to_string(),
        highlighted,
        note,
        warnings,
    }
}

/// Head and tail of the object from the preview service, in `lang`
pub async fn load_text(
    ctx: &LoadContext,
    handle: &ObjectHandle,
    lang: &str,
    max_bytes: u64,
) -> Result<PreviewData> {
    let mut request = PreviewRequest::new(sign(ctx, handle), "txt");
    request.compression = get_compression(handle.key()).map(String::from);
    request.max_bytes = Some(max_bytes);

    let json = fetch_preview(ctx.env.service.as_ref(), handle, &request).await?;
    let info = json.get("info").cloned().unwrap_or(Value::Null);
    let (head, tail) = head_tail(info.get("data").unwrap_or(&Value::Null));
    Ok(text_data(
        head,
        tail,
        lang,
        info_str(&info, "note"),
        info_str(&info, "warnings"),
    ))
}

/// Text loader; the language follows the extension
pub struct TextLoader;

#[async_trait]
impl Loader for TextLoader {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let lang = language(handle.detection_key());
        load_text(ctx, handle, &lang, ctx.env.limits.text_max_bytes).await
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

    #[tokio::test]
    async fn test_text_preview() {
        let store = MemoryStore::new();
        let svc = Arc::new(CannedService::with_preview(json!({
            "info": {
                "data": { "head": ["print(1)", "print(2)"], "tail": ["print(99)"] },
                "note": "Rows and columns truncated",
                "warnings": ""
            }
        })));
        let c = ctx(env(&store, svc.clone()), LoadOptions::default());
        let h: ObjectHandle = S3Handle::new("b", "src/main.py.gz").into();

        match TextLoader.load(&c, &h).await.unwrap() {
            PreviewData::Text {
                head,
                tail,
                lang,
                highlighted,
                note,
                warnings,
            } => {
                assert_eq!(head, "print(1)\nprint(2)");
                assert_eq!(tail, "print(99)");
                assert_eq!(lang, "python");
                assert_eq!(highlighted.head.len(), 2);
                assert_eq!(note.as_deref(), Some("Rows and columns truncated"));
                assert!(warnings.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        let requests = svc.previews.lock().unwrap();
        assert_eq!(requests[0].input, "txt");
        assert_eq!(requests[0].compression.as_deref(), Some("gz"));
        assert_eq!(requests[0].max_bytes, Some(10 * 1024));
    }
}
