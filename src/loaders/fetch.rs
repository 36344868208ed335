//! Object and preview-endpoint fetch helpers shared by loaders

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::core::{ObjectHandle, PreviewError};
use crate::error::{Error, Result};
use crate::gate::head_checked;
use crate::services::{BinaryReply, PreviewRequest, PreviewService};
use crate::store::{ByteRange, GetObject, ObjectStore, StoreError};

static CONTENT_RANGE: OnceLock<Option<Regex>> = OnceLock::new();
static ARCHIVED_BODY: OnceLock<Option<Regex>> = OnceLock::new();

fn content_range_re() -> Option<&'static Regex> {
    CONTENT_RANGE
        .get_or_init(|| Regex::new(r"bytes \d+-\d+/(\d+)$").ok())
        .as_ref()
}

fn archived_body_re() -> Option<&'static Regex> {
    ARCHIVED_BODY
        .get_or_init(|| {
            Regex::new(
                r"<Code>InvalidObjectState</Code><Message>The operation is not valid for the object's storage class</Message>",
            )
            .ok()
        })
        .as_ref()
}

/// Whether an error body reports an archived object
pub fn is_archived_body(text: &str) -> bool {
    archived_body_re().is_some_and(|re| re.is_match(text))
}

/// Classify a failed GET request
pub fn classify_get_error(handle: &ObjectHandle, e: StoreError) -> Error {
    let handle = handle.clone();
    match e.code.as_str() {
        "NoSuchKey" | "NotFound" => PreviewError::DoesNotExist { handle }.into(),
        "InvalidObjectState" => PreviewError::Archived { handle }.into(),
        "InvalidArgument" if e.message == "Invalid version id specified" => {
            PreviewError::InvalidVersion { handle }.into()
        }
        _ => Error::Store(e),
    }
}

/// Fetch the whole object
pub async fn get_object(store: &dyn ObjectStore, handle: &ObjectHandle) -> Result<GetObject> {
    store
        .get_object(&handle.location, None)
        .await
        .map_err(|e| classify_get_error(handle, e))
}

/// Fetch at most `bytes` bytes from the start of the object.
///
/// Deleted and archived objects are rejected by a HEAD before reading.
pub async fn first_bytes(
    store: &dyn ObjectStore,
    handle: &ObjectHandle,
    bytes: u64,
) -> Result<GetObject> {
    let head = head_checked(store, handle).await?;
    if head.content_length == 0 {
        return Ok(GetObject::default());
    }
    let end = head.content_length.min(bytes).saturating_sub(1);
    debug!(key = handle.key(), end, "range fetch");
    store
        .get_object(&handle.location, Some(ByteRange { start: 0, end }))
        .await
        .map_err(|e| classify_get_error(handle, e))
}

/// Total object size from a `Content-Range` header
pub fn parse_range(content_range: &str) -> Option<u64> {
    content_range_re()?
        .captures(content_range)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Query the JSON preview endpoint and classify errors reported in the body
pub async fn fetch_preview(
    service: &dyn PreviewService,
    handle: &ObjectHandle,
    request: &PreviewRequest,
) -> Result<Value> {
    let json = service.preview(request).await?;
    let error = match json.get("error") {
        Some(Value::String(error)) => error.clone(),
        Some(Value::Null) | None => return Ok(json),
        Some(other) => other.to_string(),
    };

    let handle = handle.clone();
    match error.as_str() {
        "Not Found" => Err(PreviewError::DoesNotExist { handle }.into()),
        "Forbidden" => {
            let text = json.get("text").and_then(Value::as_str).unwrap_or("");
            if is_archived_body(text) {
                Err(PreviewError::Archived { handle }.into())
            } else {
                Err(PreviewError::Forbidden { handle }.into())
            }
        }
        _ => {
            let text = json.get("text").and_then(Value::as_str).unwrap_or("");
            Err(Error::service(format!("{}: {}", error, text)))
        }
    }
}

/// Classify a failed binary (tabular or thumbnail) reply from `service`
pub fn check_binary_reply(reply: &BinaryReply, handle: &ObjectHandle, service: &str) -> Result<()> {
    if reply.is_success() {
        return Ok(());
    }
    let text = String::from_utf8_lossy(&reply.body);
    let handle = handle.clone();
    Err(match reply.status {
        404 => PreviewError::DoesNotExist { handle }.into(),
        403 if is_archived_body(&text) => PreviewError::Archived { handle }.into(),
        403 => PreviewError::Forbidden { handle }.into(),
        status => Error::service(format!("{} failed ({}): {}", service, status, text)),
    })
}

/// Lines of a `{head: [..], tail: [..]}` text preview, joined
pub fn head_tail(data: &Value) -> (String, String) {
    let join = |field: &str| {
        data.get(field)
            .and_then(Value::as_array)
            .map(|lines| {
                lines
                    .iter()
                    .map(|l| l.as_str().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    };
    (join("head"), join("tail"))
}

/// Optional string field of a preview `info` object
pub fn info_str(info: &Value, field: &str) -> Option<String> {
    info.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
