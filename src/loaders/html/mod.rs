//! HTML documents
//!
//! Untrusted HTML is shown as text. Trusted HTML inside a package in a
//! browsable bucket is served through a browsing session so relative links
//! resolve; anything else is a signed IFrame. The `iframe` mode renders
//! the document from `srcDoc` with a small file-access SDK injected.

mod bus;

use async_trait::async_trait;
use serde_json::{json, Value};

pub use bus::{BusGuard, Event, MessageBus, Request, Response, FETCH_MAX_BYTES};

use super::detect::get_compression;
use super::fetch::{fetch_preview, head_tail};
use super::text::load_text;
use super::{sign_as, LoadContext, Loader};
use crate::core::{
    AsyncResult, FileType, IFrameSource, ObjectHandle, PackageHandle, PreviewData,
};
use crate::error::Result;
use crate::services::{BrowsingSession, Endpoints, PreviewRequest};
use crate::session::SessionManager;

/// Sandbox of pages that may reach their own origin
pub const TRUSTED_SANDBOX: &str = "allow-scripts allow-same-origin";
pub const SIGNED_SANDBOX: &str = "allow-scripts";

const HTML_MODES: [FileType; 2] = [FileType::Html, FileType::Text];

pub struct HtmlLoader;

#[async_trait]
impl Loader for HtmlLoader {
    fn name(&self) -> &'static str {
        "html"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        let buckets = &ctx.env.buckets;
        if buckets.html_as_text(handle.bucket()) {
            return load_text(ctx, handle, "html", ctx.env.limits.text_max_bytes).await;
        }

        let browsable = buckets.is_browsable(handle.bucket());
        if browsable {
            if let (Some(package), Some(sessions)) = (&handle.package, &ctx.env.sessions) {
                return browse(ctx, handle, package, sessions).await;
            }
        }

        let sandbox = if browsable {
            TRUSTED_SANDBOX
        } else {
            SIGNED_SANDBOX
        };
        Ok(PreviewData::IFrame {
            source: IFrameSource::Url(sign_as(ctx, handle, "text/html")),
            modes: HTML_MODES.to_vec(),
            sandbox: Some(sandbox.to_string()),
            bus: None,
        })
    }
}

fn browse_frame(endpoints: &Endpoints, session: &BrowsingSession, handle: &ObjectHandle) -> PreviewData {
    PreviewData::IFrame {
        source: IFrameSource::Url(endpoints.browse_url(&session.id, handle.detection_key())),
        modes: HTML_MODES.to_vec(),
        sandbox: Some(TRUSTED_SANDBOX.to_string()),
        bus: None,
    }
}

/// Serve the page through a browsing session held for the life of the load.
///
/// Later session states (an expired refresh, a retried create) are
/// forwarded through the load's publisher.
async fn browse(
    ctx: &LoadContext,
    handle: &ObjectHandle,
    package: &PackageHandle,
    sessions: &SessionManager,
) -> Result<PreviewData> {
    let session = sessions.start(package.scope(), handle.clone());
    let first = session.settled().await;

    if let Some(publisher) = ctx.publisher() {
        let mut watch = session.watch();
        let env = ctx.env.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = watch.changed().await {
                publisher(snapshot.state.map(|s| browse_frame(&env.endpoints, &s, &handle)));
            }
        });
    }

    let data = match first {
        AsyncResult::Ok(ref s) => Ok(browse_frame(&ctx.env.endpoints, s, handle)),
        AsyncResult::Err(e) => Err(e.into()),
        AsyncResult::Init | AsyncResult::Pending => {
            Err(crate::error::Error::internal("browsing session stopped before settling"))
        }
    };
    ctx.retain(session);
    data
}

const SDK_SCRIPT: &str = r#"<script>
  (function () {
    let nextId = 0
    const pending = new Map()
    window.addEventListener('message', (event) => {
      const { id, result, error } = event.data || {}
      const waiter = pending.get(id)
      if (!waiter) return
      pending.delete(id)
      if (error) waiter.reject(new Error(error))
      else waiter.resolve(result)
    })
    const requestEvent = (event, payload) =>
      new Promise((resolve, reject) => {
        const id = ++nextId
        pending.set(id, { resolve, reject })
        window.parent.postMessage({ id, event, payload }, '*')
      })
    const fetchUrl = (url) => (url ? window.fetch(url) : Promise.resolve(null))
    const env = __ENV__
    window.quilt = {
      listFiles: () => requestEvent('list-files'),
      fetchFile: (handle) => requestEvent('get-file-url', handle).then(fetchUrl),
      findFile: (partial) => requestEvent('find-file-url', partial).then(fetchUrl),
      onReady: (callback) => {
        if (document.readyState === 'loading') {
          document.addEventListener('DOMContentLoaded', () => callback(env))
        } else {
          callback(env)
        }
      },
    }
  })()
</script>
"#;

/// Inject the SDK before `</head>`, or at the top when there is none
pub fn inject_sdk(html: &str, handle: &ObjectHandle) -> String {
    let env = json!({
        "fileHandle": handle.location,
        "packageHandle": handle.package.as_ref().map_or(Value::Null, |p| json!(p)),
    });
    let script = SDK_SCRIPT.replace("__ENV__", &env.to_string());
    match html.find("</head>") {
        Some(i) => format!("{}{}{}", &html[..i], script, &html[i..]),
        None => format!("{}{}", script, html),
    }
}

/// HTML rendered from `srcDoc` with the file-access SDK
pub struct IFrameLoader;

#[async_trait]
impl Loader for IFrameLoader {
    fn name(&self) -> &'static str {
        "iframe"
    }

    async fn load(&self, ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
        if ctx.env.buckets.html_as_text(handle.bucket()) {
            return load_text(ctx, handle, "html", ctx.env.limits.text_max_bytes).await;
        }

        let mut request = PreviewRequest::new(sign_as(ctx, handle, "text/html"), "txt");
        request.compression = get_compression(handle.key()).map(String::from);
        request.max_bytes = Some(ctx.env.limits.iframe_max_bytes);
        let json = fetch_preview(ctx.env.service.as_ref(), handle, &request).await?;
        let (head, tail) = head_tail(json.pointer("/info/data").unwrap_or(&Value::Null));
        let document = if tail.is_empty() {
            head
        } else {
            format!("{}\n{}", head, tail)
        };

        let env = &ctx.env;
        let bus = MessageBus::new(
            env.store.clone(),
            env.signer.clone(),
            env.endpoints.clone(),
            handle.clone(),
        );
        Ok(PreviewData::IFrame {
            source: IFrameSource::SrcDoc(inject_sdk(&document, handle)),
            modes: HTML_MODES.to_vec(),
            sandbox: Some(TRUSTED_SANDBOX.to_string()),
            bus: Some(bus),
        })
    }
}
