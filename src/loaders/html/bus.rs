//! Host side of the IFrame file-access SDK
//!
//! A page rendered from `srcDoc` talks to its host through correlated
//! request/response messages. Each IFrame instance gets its own bus; the
//! bus only answers while at least one [`BusGuard`] is alive.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::core::{ObjectHandle, S3Handle};
use crate::loaders::detect::ext_is;
use crate::services::Endpoints;
use crate::store::{ObjectStore, SignOptions, Signer};

/// `max_bytes` of text-preview URLs handed to the page
pub const FETCH_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Events the SDK can send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ListFiles,
    GetFileUrl,
    FindFileUrl,
}

impl Event {
    pub fn as_str(self) -> &'static str {
        match self {
            Event::ListFiles => "list-files",
            Event::GetFileUrl => "get-file-url",
            Event::FindFileUrl => "find-file-url",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "list-files" => Some(Event::ListFiles),
            "get-file-url" => Some(Event::GetFileUrl),
            "find-file-url" => Some(Event::FindFileUrl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct FindPayload {
    key: String,
}

struct Inner {
    store: Arc<dyn ObjectStore>,
    signer: Arc<dyn Signer>,
    endpoints: Endpoints,
    handle: ObjectHandle,
    attached: AtomicUsize,
}

/// Dispatcher for one IFrame instance
#[derive(Clone)]
pub struct MessageBus(Arc<Inner>);

impl MessageBus {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        signer: Arc<dyn Signer>,
        endpoints: Endpoints,
        handle: ObjectHandle,
    ) -> Self {
        Self(Arc::new(Inner {
            store,
            signer,
            endpoints,
            handle,
            attached: AtomicUsize::new(0),
        }))
    }

    /// Start answering; stops when the last guard is dropped
    pub fn attach(&self) -> BusGuard {
        self.0.attached.fetch_add(1, Ordering::SeqCst);
        BusGuard(self.0.clone())
    }

    pub fn is_attached(&self) -> bool {
        self.0.attached.load(Ordering::SeqCst) > 0
    }

    /// Object the page was rendered from
    pub fn handle(&self) -> &ObjectHandle {
        &self.0.handle
    }

    /// Answer one request, or nothing when detached
    pub async fn dispatch(&self, request: Request) -> Option<Response> {
        if !self.is_attached() {
            debug!(id = request.id, event = %request.event, "message bus detached, dropping request");
            return None;
        }

        let id = request.id;
        let answer = match Event::parse(&request.event) {
            Some(Event::ListFiles) => self.list_files().await,
            Some(Event::GetFileUrl) => match serde_json::from_value::<S3Handle>(request.payload) {
                Ok(target) => Ok(Value::String(self.file_url(&target))),
                Err(e) => Err(format!("invalid file handle: {}", e)),
            },
            Some(Event::FindFileUrl) => match serde_json::from_value::<FindPayload>(request.payload) {
                Ok(FindPayload { key }) => self.find_file_url(&key).await,
                Err(e) => Err(format!("invalid search: {}", e)),
            },
            None => Ok(Value::Null),
        };

        // The page may have been torn down while the listing ran
        if !self.is_attached() {
            return None;
        }

        Some(match answer {
            Ok(result) => Response {
                id,
                result,
                error: None,
            },
            Err(message) => {
                warn!(id, event = %request.event, error = %message, "message bus request failed");
                Response {
                    id,
                    result: Value::Null,
                    error: Some(message),
                }
            }
        })
    }

    /// Decode a raw JSON message and encode the answer
    pub async fn dispatch_json(&self, raw: &str) -> Option<String> {
        let request: Request = match serde_json::from_str(raw) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "ignoring malformed bus message");
                return None;
            }
        };
        let response = self.dispatch(request).await?;
        serde_json::to_string(&response).ok()
    }

    async fn siblings(&self) -> Result<Vec<S3Handle>, String> {
        let location = &self.0.handle.location;
        self.0
            .store
            .list_objects(&location.bucket, location.dir())
            .await
            .map_err(|e| e.to_string())
    }

    async fn list_files(&self) -> Result<Value, String> {
        let files: Vec<Value> = self
            .siblings()
            .await?
            .into_iter()
            .map(|h| json!({ "bucket": h.bucket, "key": h.key }))
            .collect();
        Ok(Value::Array(files))
    }

    async fn find_file_url(&self, suffix: &str) -> Result<Value, String> {
        Ok(self
            .siblings()
            .await?
            .iter()
            .find(|h| h.key.ends_with(suffix))
            .map_or(Value::Null, |h| Value::String(self.file_url(h))))
    }

    /// Preview-service URL the page can fetch `target` through
    fn file_url(&self, target: &S3Handle) -> String {
        let signed = self.0.signer.sign(target, &SignOptions::default());
        if ext_is(&target.key, ".csv") {
            self.0.endpoints.csv_preview_url(&signed)
        } else {
            self.0.endpoints.text_preview_url(&signed, FETCH_MAX_BYTES)
        }
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("handle", &self.0.handle)
            .field("attached", &self.0.attached.load(Ordering::SeqCst))
            .finish()
    }
}

/// Two buses are equal when they are the same instance
impl PartialEq for MessageBus {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Keeps a [`MessageBus`] attached
pub struct BusGuard(Arc<Inner>);

impl Drop for BusGuard {
    fn drop(&mut self) {
        self.0.attached.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn bus(store: &MemoryStore) -> MessageBus {
        MessageBus::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Endpoints {
                api_gateway: "https://api".into(),
                binary_api_gateway: "https://bin".into(),
                ..Default::default()
            },
            S3Handle::new("b", "site/index.html").into(),
        )
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put("b", "site/index.html", "<html></html>")
            .put("b", "site/data/movies.json", "[]")
            .put("b", "site/table.csv", "a,b")
            .put("b", "other/x.txt", "x");
        store
    }

    fn request(event: &str, payload: Value) -> Request {
        Request {
            id: 7,
            event: event.into(),
            payload,
        }
    }

    #[tokio::test]
    async fn test_detached_bus_does_not_answer() {
        let store = store();
        let bus = bus(&store);
        assert!(bus.dispatch(request("list-files", Value::Null)).await.is_none());

        let guard = bus.attach();
        assert!(bus.dispatch(request("list-files", Value::Null)).await.is_some());
        drop(guard);
        assert!(!bus.is_attached());
        assert!(bus.dispatch(request("list-files", Value::Null)).await.is_none());
    }

    #[tokio::test]
    async fn test_list_files_lists_directory() {
        let store = store();
        let bus = bus(&store);
        let _guard = bus.attach();

        let response = bus.dispatch(request("list-files", Value::Null)).await.unwrap();
        assert_eq!(response.id, 7);
        assert_eq!(
            response.result,
            json!([
                { "bucket": "b", "key": "site/index.html" },
                { "bucket": "b", "key": "site/table.csv" }
            ])
        );
    }

    #[tokio::test]
    async fn test_file_urls_by_extension() {
        let store = store();
        let bus = bus(&store);
        let _guard = bus.attach();

        let csv = bus
            .dispatch(request("get-file-url", json!({ "bucket": "b", "key": "site/table.csv" })))
            .await
            .unwrap();
        let url = csv.result.as_str().unwrap();
        assert!(url.starts_with("https://bin/tabular-preview?"));
        assert!(url.contains("size=large"));

        let text = bus
            .dispatch(request("get-file-url", json!({ "bucket": "b", "key": "site/index.html" })))
            .await
            .unwrap();
        let url = text.result.as_str().unwrap();
        assert!(url.starts_with("https://api/preview?"));
        assert!(url.contains("max_bytes=20971520"));
    }

    #[tokio::test]
    async fn test_find_file_url() {
        let store = store();
        let bus = bus(&store);
        let _guard = bus.attach();

        let found = bus
            .dispatch(request("find-file-url", json!({ "key": "table.csv" })))
            .await
            .unwrap();
        assert!(found.result.as_str().unwrap().contains("tabular-preview"));

        let missing = bus
            .dispatch(request("find-file-url", json!({ "key": "movies.json" })))
            .await
            .unwrap();
        assert_eq!(missing.result, Value::Null);
        assert!(missing.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_event_and_bad_payload() {
        let store = store();
        let bus = bus(&store);
        let _guard = bus.attach();

        let unknown = bus.dispatch(request("open-window", Value::Null)).await.unwrap();
        assert_eq!(unknown.result, Value::Null);
        assert!(unknown.error.is_none());

        let bad = bus.dispatch(request("get-file-url", json!(42))).await.unwrap();
        assert!(bad.error.is_some());
    }

    #[tokio::test]
    async fn test_dispatch_json() {
        let store = store();
        let bus = bus(&store);
        let _guard = bus.attach();

        let raw = bus
            .dispatch_json(r#"{"id":3,"event":"find-file-url","payload":{"key":"index.html"}}"#)
            .await
            .unwrap();
        let response: Response = serde_json::from_str(&raw).unwrap();
        assert_eq!(response.id, 3);
        assert!(response.result.is_string());

        assert!(bus.dispatch_json("not json").await.is_none());
    }

    #[test]
    fn test_event_names() {
        for event in [Event::ListFiles, Event::GetFileUrl, Event::FindFileUrl] {
            assert_eq!(Event::parse(event.as_str()), Some(event));
        }
        assert_eq!(Event::parse("nope"), None);
    }
}
