//! Integration tests for catalog-preview
//!
//! These tests drive the public API over an in-memory object store with
//! canned preview and session services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use catalog_preview::app::{render, MessageAction, Preview, Rendered};
use catalog_preview::core::{
    AsyncResult, FileType, IFrameSource, ObjectHandle, PackageHandle, PreviewData, PreviewError,
    PreviewResult, S3Handle,
};
use catalog_preview::error::{Error, Result};
use catalog_preview::loaders::text::TextLoader;
use catalog_preview::loaders::{Env, LoadContext, LoadOptions, Loader, UnsupportedLoader};
use catalog_preview::registry::{Registry, RegistryBuilder};
use catalog_preview::services::{
    BinaryReply, BrowsingSession, PreviewRequest, PreviewService, SessionApi, TabularRequest,
    ThumbnailRequest,
};
use catalog_preview::session::{SessionConfig, SessionManager};
use catalog_preview::store::{MemoryStore, StoreError};

/// Preview service answering every JSON request with one canned body
#[derive(Default)]
struct Canned {
    body: Option<Value>,
    requests: Mutex<Vec<PreviewRequest>>,
}

#[async_trait]
impl PreviewService for Canned {
    async fn preview(&self, request: &PreviewRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        self.body
            .clone()
            .ok_or_else(|| Error::service("no canned preview"))
    }

    async fn tabular(&self, _request: &TabularRequest) -> Result<BinaryReply> {
        Err(Error::service("no canned tabular preview"))
    }

    async fn thumbnail(&self, _request: &ThumbnailRequest) -> Result<BinaryReply> {
        Err(Error::service("no canned thumbnail"))
    }
}

/// Session API whose refreshes always report the session gone
#[derive(Default)]
struct ForgetfulSessions {
    creates: AtomicUsize,
    disposed: Mutex<Vec<String>>,
}

#[async_trait]
impl SessionApi for ForgetfulSessions {
    async fn create(&self, _scope: &str, ttl: u64) -> Result<BrowsingSession> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(BrowsingSession {
            id: format!("s{}", n),
            expires: Utc::now() + chrono::Duration::seconds(ttl as i64),
        })
    }

    async fn refresh(&self, _id: &str, _ttl: u64) -> Result<BrowsingSession> {
        Err(Error::session("SessionNotFound", "session is gone"))
    }

    async fn dispose(&self, id: &str) -> Result<()> {
        self.disposed.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

fn env_with(store: &MemoryStore, service: Arc<Canned>) -> Env {
    Env::new(Arc::new(store.clone()), Arc::new(store.clone()), service)
}

fn handle(key: &str) -> ObjectHandle {
    S3Handle::new("b", key).into()
}

/// Next settled state published after the current one
async fn next_settled(task: &mut catalog_preview::app::PreviewTask) -> PreviewResult {
    loop {
        match task.changed().await {
            Some(result) if result.is_settled() => return result,
            Some(_) => continue,
            None => panic!("preview closed"),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

mod registry_tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Loader for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn load(&self, _ctx: &LoadContext, handle: &ObjectHandle) -> Result<PreviewData> {
            Ok(PreviewData::Audio {
                src: handle.key().to_string(),
            })
        }
    }

    #[test]
    fn test_standard_order_ends_with_catch_all() {
        let registry = Registry::standard();
        let names = registry.names();
        assert_eq!(names.first(), Some(&"manifest"));
        assert_eq!(names.last(), Some(&"fallback"));

        let position = |name| names.iter().position(|n| *n == name).unwrap();
        assert!(position("tabular") < position("text"));
        assert!(position("markdown") < position("text"));
        assert!(position("jupyter") < position("json"));
    }

    #[test]
    fn test_mode_hint_beats_extension() {
        let registry = Registry::standard();
        let vega = LoadOptions::with_mode(FileType::Vega);
        assert_eq!(registry.choose("table.csv", &vega).name(), "vega");
        assert_eq!(
            registry.choose("table.csv", &LoadOptions::default()).name(),
            "tabular"
        );
        assert_eq!(
            registry.choose("x.unknown", &LoadOptions::default()).name(),
            "fallback"
        );
    }

    #[tokio::test]
    async fn test_custom_registry_drives_preview() {
        let registry = RegistryBuilder::new()
            .register("echo", |key, _| key.ends_with(".echo"), Echo)
            .register("plain", |key, _| key.ends_with(".txt"), TextLoader)
            .fallback(UnsupportedLoader);
        let store = MemoryStore::new();
        let preview = Preview::new(Arc::new(env_with(&store, Arc::default())), registry);

        let task = preview.load(handle("dir/a.echo"), LoadOptions::default());
        assert_eq!(
            task.settled().await,
            AsyncResult::Ok(PreviewData::Audio {
                src: "dir/a.echo".into()
            })
        );

        let task = preview.load(handle("dir/a.bin"), LoadOptions::default());
        assert!(matches!(
            task.settled().await,
            AsyncResult::Err(PreviewError::Unsupported { .. })
        ));
    }
}

// =============================================================================
// Gate
// =============================================================================

mod gate_tests {
    use super::*;
    use catalog_preview::gate::{gate, SizeThresholds};

    fn thresholds() -> SizeThresholds {
        SizeThresholds {
            auto_fetch: 10,
            never_fetch: 100,
        }
    }

    fn preview_error(result: Result<bool>) -> PreviewError {
        match result {
            Err(Error::Preview(e)) => e,
            other => panic!("expected a preview error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_size_classes() {
        let store = MemoryStore::new();
        store
            .put("b", "small", vec![0u8; 10])
            .put("b", "medium", vec![0u8; 11])
            .put("b", "large", vec![0u8; 101]);

        assert!(!gate(&store, &handle("small"), &thresholds()).await.unwrap());
        assert!(gate(&store, &handle("medium"), &thresholds()).await.unwrap());
        assert!(matches!(
            preview_error(gate(&store, &handle("large"), &thresholds()).await),
            PreviewError::TooLarge { .. }
        ));
    }

    #[tokio::test]
    async fn test_archive_is_checked_before_size() {
        let store = MemoryStore::new();
        store
            .put("b", "cold", vec![0u8; 1000])
            .set_storage_class("b", "cold", "GLACIER");
        assert!(matches!(
            preview_error(gate(&store, &handle("cold"), &thresholds()).await),
            PreviewError::Archived { .. }
        ));
    }

    #[tokio::test]
    async fn test_version_errors_need_a_version() {
        let store = MemoryStore::new();
        store.fail_head("b", "k", StoreError::new(405, "MethodNotAllowed", "not allowed"));

        let versioned: ObjectHandle = S3Handle::new("b", "k").with_version("v1").into();
        assert!(matches!(
            preview_error(gate(&store, &versioned, &thresholds()).await),
            PreviewError::Deleted { .. }
        ));
        assert!(matches!(
            gate(&store, &handle("k"), &thresholds()).await,
            Err(Error::Store(_))
        ));
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

mod preview_tests {
    use super::*;
    use catalog_preview::gate::SizeThresholds;

    fn preview(store: &MemoryStore, service: Arc<Canned>, thresholds: SizeThresholds) -> Preview {
        let mut env = env_with(store, service);
        env.thresholds = thresholds;
        Preview::new(Arc::new(env), Registry::standard())
    }

    #[tokio::test]
    async fn test_gated_markdown_unlocks_from_message() {
        let store = MemoryStore::new();
        store.put("b", "README.md", "# Title\n\nA paragraph of text.");
        let preview = preview(
            &store,
            Arc::default(),
            SizeThresholds {
                auto_fetch: 10,
                never_fetch: 1000,
            },
        );

        let task = preview.load(handle("README.md"), LoadOptions::default());
        let gated = task.settled().await;
        let unlock = match render(&gated, None) {
            Rendered::Message {
                heading,
                action: Some(MessageAction::Unlock(action)),
                ..
            } => {
                assert_eq!(heading, "Object is Large");
                action
            }
            other => panic!("unexpected {:?}", other),
        };

        unlock.invoke();
        match task.settled().await {
            AsyncResult::Ok(PreviewData::Markdown { rendered, .. }) => {
                assert!(rendered.contains("<h1>Title</h1>"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(task.generation(), 2);
    }

    #[tokio::test]
    async fn test_malformed_json_is_shown_as_text() {
        let store = MemoryStore::new();
        store.put("b", "bad.json", r#"{"a": }"#);
        let preview = preview(&store, Arc::default(), SizeThresholds::default());

        let task = preview.load(handle("bad.json"), LoadOptions::default());
        match task.settled().await {
            AsyncResult::Ok(PreviewData::Text { head, lang, .. }) => {
                assert_eq!(head, r#"{"a": }"#);
                assert_eq!(lang, "json");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_json_falls_back_to_text_preview() {
        let store = MemoryStore::new();
        store.put("b", "big.json", vec![b' '; 200]);
        let service = Arc::new(Canned {
            body: Some(json!({ "info": { "data": { "head": ["{"], "tail": ["}"] } } })),
            ..Default::default()
        });
        let preview = preview(
            &store,
            service.clone(),
            SizeThresholds {
                auto_fetch: 10,
                never_fetch: 100,
            },
        );

        let task = preview.load(handle("big.json"), LoadOptions::default());
        match task.settled().await {
            AsyncResult::Ok(PreviewData::Text { head, tail, .. }) => {
                assert_eq!(head, "{");
                assert_eq!(tail, "}");
            }
            other => panic!("unexpected {:?}", other),
        }
        let requests = service.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].input, "txt");
    }

    #[tokio::test]
    async fn test_unsupported_offers_download() {
        let store = MemoryStore::new();
        let preview = preview(&store, Arc::default(), SizeThresholds::default());

        let task = preview.load(handle("blob.bin"), LoadOptions::default());
        let result = task.settled().await;
        let rendered = render(&result, Some(&store));
        assert_eq!(
            rendered.to_string(),
            "Preview Not Available\nDownload: memory://b/blob.bin"
        );
    }

    #[tokio::test]
    async fn test_missing_object_is_reported() {
        let store = MemoryStore::new();
        let preview = preview(&store, Arc::default(), SizeThresholds::default());

        let task = preview.load(handle("gone.md"), LoadOptions::default());
        let result = task.settled().await;
        assert!(matches!(
            result,
            AsyncResult::Err(PreviewError::DoesNotExist { .. })
        ));
        assert!(matches!(
            render(&result, None),
            Rendered::Message { action: None, .. }
        ));
    }
}

// =============================================================================
// Browsing Sessions
// =============================================================================

mod session_tests {
    use super::*;

    fn package_page() -> ObjectHandle {
        let package = PackageHandle::parse("b/user/site@abc123").unwrap();
        ObjectHandle::new(S3Handle::new("b", ".quilt/objects/abc")).in_package(package, "site/index.html")
    }

    fn browse_url(data: &PreviewData) -> String {
        match data {
            PreviewData::IFrame {
                source: IFrameSource::Url(url),
                ..
            } => url.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_retries_without_reloading() {
        let store = MemoryStore::new();
        let api = Arc::new(ForgetfulSessions::default());
        let mut env = env_with(&store, Arc::default());
        env.sessions = Some(SessionManager::new(api.clone(), SessionConfig::default()));
        env.buckets.browsable = vec!["b".to_string()];
        env.buckets.local_mode = true;
        let preview = Preview::new(Arc::new(env), Registry::standard());

        let mut task = preview.load(package_page(), LoadOptions::default());
        match task.settled().await {
            AsyncResult::Ok(data) => assert!(browse_url(&data).ends_with("/browse/s1/site/index.html")),
            other => panic!("unexpected {:?}", other),
        }

        // First refresh is due after 36s and fails
        tokio::time::sleep(Duration::from_secs(40)).await;
        let expired = task.current();
        let retry = match render(&expired, None) {
            Rendered::Message {
                heading,
                action: Some(MessageAction::Retry(retry)),
                ..
            } => {
                assert_eq!(heading, "Session Expired");
                retry
            }
            other => panic!("unexpected {:?}", other),
        };

        retry.invoke();
        match next_settled(&mut task).await {
            AsyncResult::Ok(data) => assert!(browse_url(&data).ends_with("/browse/s2/site/index.html")),
            other => panic!("unexpected {:?}", other),
        }
        // The session recovered inside the same load
        assert_eq!(task.generation(), 1);

        task.close();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let mut disposed = api.disposed.lock().unwrap().clone();
        disposed.sort();
        assert_eq!(disposed, vec!["s1".to_string(), "s2".to_string()]);
    }
}
